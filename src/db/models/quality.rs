//! Sleep quality rating scale.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    pub fn as_i64(&self) -> i64 {
        match self {
            SleepQuality::VeryBad => 0,
            SleepQuality::Poor => 1,
            SleepQuality::SoSo => 2,
            SleepQuality::Ok => 3,
            SleepQuality::PrettyGood => 4,
            SleepQuality::Excellent => 5,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(SleepQuality::VeryBad),
            1 => Ok(SleepQuality::Poor),
            2 => Ok(SleepQuality::SoSo),
            3 => Ok(SleepQuality::Ok),
            4 => Ok(SleepQuality::PrettyGood),
            5 => Ok(SleepQuality::Excellent),
            other => Err(anyhow!("sleep quality {other} is outside 0..=5")),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SleepQuality::VeryBad => "Very bad",
            SleepQuality::Poor => "Poor",
            SleepQuality::SoSo => "So-so",
            SleepQuality::Ok => "OK",
            SleepQuality::PrettyGood => "Pretty good",
            SleepQuality::Excellent => "Excellent",
        }
    }
}
