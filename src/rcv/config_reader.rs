use crate::rcv::io_common::column_letters_to_index;
use crate::rcv::*;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::collections::HashMap;
use std::fs;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
}

/// A file with polling numbers.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstRowIndex")]
    _first_row_index: Option<JSValue>,
    #[serde(rename = "nameColumnIndex")]
    _name_column_index: Option<JSValue>,
    #[serde(rename = "supportColumnIndex")]
    _support_column_index: Option<JSValue>,
    #[serde(rename = "exhaustionColumnIndex")]
    _exhaustion_column_index: Option<JSValue>,
}

impl PollSource {
    pub fn new(provider: &str, file_path: &str) -> PollSource {
        PollSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_row_index: None,
            _name_column_index: None,
            _support_column_index: None,
            _exhaustion_column_index: None,
        }
    }

    /// The first row with polling numbers (1-based). Defaults to 2, after the header.
    pub fn first_row_index(&self) -> RcvResult<usize> {
        match self._first_row_index {
            Some(_) => read_js_index(&self._first_row_index),
            None => Ok(2),
        }
    }

    // All the column accessors are 0-based.

    pub fn name_column_index(&self) -> RcvResult<usize> {
        match self._name_column_index {
            Some(_) => read_js_index(&self._name_column_index).map(|x| x - 1),
            None => Ok(0),
        }
    }

    pub fn support_column_index(&self) -> RcvResult<usize> {
        match self._support_column_index {
            Some(_) => read_js_index(&self._support_column_index).map(|x| x - 1),
            None => Ok(1),
        }
    }

    pub fn exhaustion_column_index(&self) -> RcvResult<Option<usize>> {
        if self._exhaustion_column_index.is_some() {
            read_js_index(&self._exhaustion_column_index).map(|x| Some(x - 1))
        } else {
            Ok(None)
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvCandidate {
    pub name: String,
    pub support: Option<f64>,
    #[serde(rename = "exhaustionRate")]
    pub exhaustion_rate: Option<f64>,
    pub ideology: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub candidates: Vec<RcvCandidate>,
    #[serde(rename = "ideologyModifiers", default)]
    pub ideology_modifiers: HashMap<String, HashMap<String, f64>>,
    #[serde(rename = "defaultModifier")]
    pub default_modifier: Option<f64>,
    #[serde(rename = "pollSources", default)]
    pub poll_sources: Vec<PollSource>,
}

pub fn read_config(path: &str) -> RcvResult<RcvConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RcvConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> RcvResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// 1-based index, either a number or Excel-style letters.
fn read_js_index(x: &Option<JSValue>) -> RcvResult<usize> {
    let idx = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            column_letters_to_index(s)
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        _ => None,
    };
    match idx {
        Some(i) if i >= 1 => Ok(i),
        _ => ParsingJsonNumberSnafu {
            content: format!("{:?}", x),
        }
        .fail(),
    }
}
