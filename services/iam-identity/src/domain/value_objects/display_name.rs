//! 显示名称值对象

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_errors::AppError;

const MIN_CHARS: usize = 2;
const MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// 去除首尾空白后长度须在 2..=100 个字符之间
    pub fn new(name: impl AsRef<str>) -> Result<Self, AppError> {
        let name = name.as_ref().trim();

        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }

        let len = name.chars().count();
        if !(MIN_CHARS..=MAX_CHARS).contains(&len) {
            return Err(AppError::validation(format!(
                "name must be between {} and {} characters",
                MIN_CHARS, MAX_CHARS
            )));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
