//! Loadfile handling
//!
//! A loadfile is parsed once into a [`Script`] shared by every client. Each
//! client then takes its own copy of the operations with `$CLIENT` expanded
//! to its id, so the records a dispatcher consumes are never shared.

mod op;
mod parser;

pub use op::OpKind;
pub use parser::parse_line;

use crate::error::ScriptError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum numeric parameters per operation
pub const MAX_PARAMS: usize = 10;

/// Placeholder in loadfile paths replaced by the client id
pub const CLIENT_PLACEHOLDER: &str = "$CLIENT";

/// One scripted operation
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation kind
    pub kind: OpKind,

    /// Owning client id
    pub client: usize,

    /// Loadfile line number (1-based)
    pub line: usize,

    /// Primary path (empty for FSSTAT/FSINFO)
    pub path: String,

    /// Secondary path for SYMLINK, LINK and RENAME
    pub path2: Option<String>,

    /// Expected status pattern
    pub expected: String,

    /// Numeric parameters; only the first `nparams` are meaningful
    pub params: [i64; MAX_PARAMS],

    /// Number of parameters given
    pub nparams: usize,
}

impl Operation {
    /// The parameters actually given on the loadfile line
    pub fn params(&self) -> &[i64] {
        &self.params[..self.nparams]
    }

    /// Parameter `idx`, or 0 when absent
    pub fn param(&self, idx: usize) -> i64 {
        self.params().get(idx).copied().unwrap_or(0)
    }

    /// Copy of this operation owned by `client_id`
    pub fn for_client(&self, client_id: usize) -> Operation {
        let id = client_id.to_string();
        Operation {
            client: client_id,
            path: self.path.replace(CLIENT_PLACEHOLDER, &id),
            path2: self
                .path2
                .as_ref()
                .map(|p| p.replace(CLIENT_PLACEHOLDER, &id)),
            ..self.clone()
        }
    }
}

/// A parsed loadfile
#[derive(Debug, Clone)]
pub struct Script {
    source: PathBuf,
    operations: Vec<Operation>,
}

impl Script {
    /// Read and parse a loadfile
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::parse(&text, path)?;
        debug!(
            loadfile = %path.display(),
            operations = script.len(),
            "Loadfile parsed"
        );
        Ok(script)
    }

    /// Parse loadfile text; `source` is only used in errors
    pub fn parse(text: &str, source: &Path) -> Result<Self, ScriptError> {
        let mut operations = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(op) = parse_line(line, idx + 1)? {
                operations.push(op);
            }
        }

        if operations.is_empty() {
            return Err(ScriptError::Empty {
                path: source.to_path_buf(),
            });
        }

        Ok(Self {
            source: source.to_path_buf(),
            operations,
        })
    }

    /// Loadfile path
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True if the script has no operations (never after a successful parse)
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations as parsed, placeholders unexpanded
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// The operations one client replays, in script order
    pub fn operations_for(&self, client_id: usize) -> Vec<Operation> {
        self.operations
            .iter()
            .map(|op| op.for_client(client_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOADFILE: &str = r#"
# directory setup
MKDIR3 "/clients/client$CLIENT" 0x00000000
CREATE3 "/clients/client$CLIENT/f" 0x00000000
WRITE3 "/clients/client$CLIENT/f" 0 4096 0 0x00000000
RENAME3 "/clients/client$CLIENT/f" "/clients/client$CLIENT/g" *
"#;

    #[test]
    fn test_parse_script() {
        let script = Script::parse(LOADFILE, Path::new("test.load")).unwrap();
        assert_eq!(script.len(), 4);
        assert_eq!(script.operations()[0].line, 3);
        assert_eq!(script.operations()[3].kind, OpKind::Rename);
        assert_eq!(script.source(), Path::new("test.load"));
    }

    #[test]
    fn test_operations_for_expands_client() {
        let script = Script::parse(LOADFILE, Path::new("test.load")).unwrap();
        let ops = script.operations_for(7);
        assert!(ops.iter().all(|op| op.client == 7));
        assert_eq!(ops[0].path, "/clients/client7");
        assert_eq!(ops[3].path2.as_deref(), Some("/clients/client7/g"));
        // Shared script is untouched
        assert_eq!(script.operations()[0].path, "/clients/client$CLIENT");
    }

    #[test]
    fn test_empty_script() {
        let err = Script::parse("# nothing\n\n", Path::new("empty.load")).unwrap_err();
        assert!(matches!(err, ScriptError::Empty { .. }));
    }

    #[test]
    fn test_error_line_numbers() {
        let err = Script::parse("GETATTR3 \"/a\" *\nBOGUS3 \"/a\" *\n", Path::new("x")).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownOperation { line: 2, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LOADFILE.as_bytes()).unwrap();
        let script = Script::load(file.path()).unwrap();
        assert_eq!(script.len(), 4);

        let err = Script::load(Path::new("/no/such/loadfile")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }

    #[test]
    fn test_param_accessor() {
        let op = parse_line("READ3 \"/f\" 8192 4096 *", 1).unwrap().unwrap();
        assert_eq!(op.param(0), 8192);
        assert_eq!(op.param(1), 4096);
        assert_eq!(op.param(2), 0);
    }
}
