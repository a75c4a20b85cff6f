//! ドライブ1台分の物理状態
//!
//! トラック位置はクォータートラック単位で保持する。実トラック番号は
//! `track >> 2`。ヘッド位置 `head` は現在トラック内のニブル/ビット
//! オフセットで、ドライバがトラックデータ長に合わせてラップさせる。

use serde::{Deserialize, Serialize};

/// ドライブの物理状態（メディアとは独立）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Drive {
    /// ヘッド位置（クォータートラック単位）
    pub track: i32,
    /// 現在トラック内のニブル/ビットオフセット
    pub head: usize,
    /// 最後にONになったステッパーフェーズ (0-3)
    pub phase: u8,
    /// ライトプロテクト
    pub read_only: bool,
    /// 挿入後に書き込みが発生したか
    pub dirty: bool,
}

impl Drive {
    /// 実トラック番号（クォータートラックを落とす）
    pub fn whole_track(&self) -> usize {
        (self.track >> 2) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_track() {
        let mut d = Drive::default();
        d.track = 17 * 4;
        assert_eq!(d.whole_track(), 17);
        d.track = 17 * 4 + 3;
        assert_eq!(d.whole_track(), 17);
    }
}
