/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
pub const CONFIG_INVALID: i32 = 2;
/// A step failed and everything it had done was undone.
pub const INSTALL_FAILED: i32 = 3;
pub const RUNTIME_ERROR: i32 = 4;
/// At least one compensation failed; the host may be partially installed.
pub const ROLLBACK_INCOMPLETE: i32 = 5;
pub const ABORTED: i32 = 6;
