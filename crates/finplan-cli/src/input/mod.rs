pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a request from `--input` when given, otherwise from piped stdin.
pub fn read_request<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_document(path);
    }
    match stdin::read_stdin::<T>()? {
        Some(request) => Ok(request),
        None => Err(format!("--input <file> or stdin required for {command}").into()),
    }
}
