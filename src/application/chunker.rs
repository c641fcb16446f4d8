//! # Chunker
//!
//! Splits narrative text into transport-size-bounded pieces. Priority
//! order: paragraph breaks, then line breaks, then a hard cut at the limit.
//! Pure and stateless; never drops content, never exceeds the limit.

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into chunks of at most `limit` characters.
pub fn smart_chunk_text(text: &str, limit: usize) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for para in text.split("\n\n") {
        // +2 for the blank line the split removed
        if char_len(&current) + char_len(para) + 2 <= limit {
            current.push_str(para);
            current.push_str("\n\n");
            continue;
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }
        current.clear();

        if char_len(para) <= limit {
            current.push_str(para);
            current.push_str("\n\n");
            continue;
        }

        // Paragraph alone exceeds the limit: pack line by line
        for line in para.split('\n') {
            if char_len(&current) + char_len(line) + 1 <= limit {
                current.push_str(line);
                current.push('\n');
                continue;
            }

            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
            }
            current.clear();

            if char_len(line) <= limit {
                current.push_str(line);
                current.push('\n');
            } else {
                // Single line exceeds the limit: hard cut
                let mut rest: String = line.to_string();
                while char_len(&rest) > limit {
                    let head: String = rest.chars().take(limit).collect();
                    let tail: String = rest.chars().skip(limit).collect();
                    chunks.push(head);
                    rest = tail;
                }
                current = rest;
                current.push('\n');
            }
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}
