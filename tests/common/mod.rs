#![allow(dead_code)]

pub use jest_lsp_test_utils::{builders, fake_runner, init_tracing, with_timeout};

use tower_lsp::lsp_types::Url;

/// File URI for a path under a fake project root.
pub fn file_uri(path: &str) -> Url {
    Url::parse(&format!("file:///work/proj/{path}")).expect("valid test uri")
}
