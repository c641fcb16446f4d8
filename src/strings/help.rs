//! # Help
//!
//! The command list shown by `/help`.

pub const HELP_TEXT: &str = "\
📜 **Command List**

**Dice**
`/roll <notation>` - roll dice (e.g. `2d6+3`, `d%`, `4dF`, `5d6p`)
`/roll` - execute your pending roll call

**Presence**
`/away <auto-pilot|off-screen|narrative-exit>` - mark yourself away
`/back` - return from away

**Campaign**
`/sheet` - view your character sheet
`/ledger` - view the master ledger
`/rewind <new direction>` - undo the last memory update and redirect
`/session <start|zero|pause|resume|end|close>` - manage the session phase

**Table talk**
`/ooc <message>` - out-of-character message
`/visual [prompt]` - request a scene visual
`/x [reason]` - X-Card safety tool

**Feedback**
`/stars <message>` - something you liked
`/wishes <message>` - something you want to see

**Admin**
`/reset_memory` - wipe and rebuild all ledgers from history
";
