//! This module provides the `ProgramLoader` struct, responsible for loading JSON program
//! descriptions from files, directories and strings.

use crate::program::Program;
use crate::types::{TuringMachineError, MAX_PROGRAM_SIZE};
use std::fs;
use std::path::{Path, PathBuf};

/// The file extension of program files.
pub const PROGRAM_EXTENSION: &str = "json";

/// `ProgramLoader` is a utility struct for loading [`Program`]s.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and decoded.
    /// * `Err(TuringMachineError::FileError)` if the file cannot be read.
    /// * `Err(TuringMachineError::ValidationError)` if the file exceeds `MAX_PROGRAM_SIZE`.
    /// * `Err(TuringMachineError::ParseError)` if the file content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, TuringMachineError> {
        let size = fs::metadata(path)
            .map_err(|e| {
                TuringMachineError::FileError(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                ))
            })?
            .len();
        Self::check_size(size)?;

        let content = fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Self::load_program_from_string(&content)
    }

    /// Loads a single program from the provided JSON content.
    pub fn load_program_from_string(content: &str) -> Result<Program, TuringMachineError> {
        Self::check_size(content.len() as u64)?;

        serde_json::from_str(content).map_err(|e| TuringMachineError::ParseError(e.to_string()))
    }

    fn check_size(size: u64) -> Result<(), TuringMachineError> {
        if size > MAX_PROGRAM_SIZE as u64 {
            return Err(TuringMachineError::ValidationError(format!(
                "Program is {} bytes, the limit is {}",
                size, MAX_PROGRAM_SIZE
            )));
        }
        Ok(())
    }

    /// Loads every program file (`.json` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each element of the
    /// result holds either the path and the decoded program, or the error for that file.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), TuringMachineError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TuringMachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(e) => {
                        return Some(Err(TuringMachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                    return None;
                }

                Some(Self::load_program(&path).map(|program| (path, program)))
            })
            .collect()
    }
}
