//! Fixed fallback values for omitted preambles
//!
//! These are deliberately not configurable from the script itself; the
//! CLI may override the directory and archive locations per invocation.

/// Root output directory when no WORKDIR directive is given
pub const WORKDIR: &str = "/tmp/triage";

/// Archive file name when no OUTPUT directive is given
pub const OUTPUT_FILE: &str = "triage_out.tar.gz";

/// SSH port assumed for `host`-only machine forms
pub const SSH_PORT: u16 = 22;

/// Sentinel address for the local machine
pub const LOCAL_ADDRESS: &str = "local";

/// Context variable holding the last RUN result
pub const RESULT_VAR: &str = "CMD_RESULT";
