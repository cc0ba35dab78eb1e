pub mod config_cmd;
pub mod filter;
pub mod rewrite;
pub mod search;

use std::io::Read;
use std::path::Path;

/// Read all of `file`, or stdin when no file is given.
pub fn read_input(file: Option<&Path>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}
