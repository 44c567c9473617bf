//! IO helper: JSON file reading for records, active node and config

use std::{fs::File, io::BufReader, path::Path};

use serde::de::DeserializeOwned;

use crate::model::controller::TreeError;

/// 从文件读取并反序列化 JSON
pub fn read_json_file<T: DeserializeOwned>(p: &Path) -> Result<T, TreeError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v: T = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 从已取得的文本反序列化 JSON
pub fn parse_json_text<T: DeserializeOwned>(text: &str) -> Result<T, TreeError> {
    Ok(serde_json::from_str(text)?)
}
