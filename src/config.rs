// ABOUTME: Version info and REPL welcome banner

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Pebble Lisp v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking Scheme-flavored Lisp with a tracing garbage collector";
pub const WELCOME_FOOTER: &str = "Type (exit) or Ctrl-D to quit, (gc) to force a collection.";
