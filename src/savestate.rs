//! セーブステート
//!
//! ディスクサブシステム全体のスナップショット型。ドライバ本体は
//! トレイトオブジェクトなので、ドライバ固有状態だけを列挙型に写し、
//! 復元時にディスク形状からドライバを再構築して書き戻す。

use serde::{Deserialize, Serialize};

use crate::controller::ControllerState;
use crate::disk::FloppyDisk;
use crate::drive::Drive;

pub const CURRENT_VERSION: u32 = 1;

/// ドライバ固有状態
///
/// 疑似ビット源のRNG内部状態は含まない（復元後の疑似ビットは
/// 再現不要なノイズであり、決定論が要るテストはシード付き構築を使う）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DriverSnapshot {
    Empty,
    Nibble { skip: u8, nibble_count: u32 },
    Woz { last_cycles: u64, zeros: u32 },
}

/// ドライブ1台分のスナップショット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSnapshot {
    pub disk: FloppyDisk,
    pub driver: DriverSnapshot,
    pub drive: Drive,
}

/// カード全体のスナップショット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disk2Snapshot {
    pub version: u32,
    pub controller: ControllerState,
    pub drives: [DriveSnapshot; 2],
}
