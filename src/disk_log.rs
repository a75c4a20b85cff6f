//! Disk II ログシステム
//!
//! 原則:
//! 1. ログは「現象」ではなく「判断」を記録
//! 2. 状態遷移のみ記録（毎回のI/Oは記録しない）
//! 3. レベル分離: FLOW / STATE / DECIDE / NIBBLE

use std::sync::atomic::{AtomicU32, Ordering};

bitflags::bitflags! {
    /// ログカテゴリ
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DiskLogLevel: u32 {
        /// L1: 何が起きているか（人間向け）
        const FLOW   = 0b0001;
        /// L2: 状態遷移（開発者向け）
        const STATE  = 0b0010;
        /// L2: 判断（スピンダウン等）
        const DECIDE = 0b0100;
        /// L3: 生データ（短時間のみ）
        const NIBBLE = 0b1000;
    }
}

/// グローバルログレベル
static LOG_LEVEL: AtomicU32 = AtomicU32::new(0);

/// ログレベルを設定
pub fn set_log_level(level: DiskLogLevel) {
    LOG_LEVEL.store(level.bits(), Ordering::Relaxed);
}

/// 現在のログレベルを取得
pub fn get_log_level() -> DiskLogLevel {
    DiskLogLevel::from_bits_truncate(LOG_LEVEL.load(Ordering::Relaxed))
}

/// ログレベルが有効かチェック
#[inline]
pub fn is_enabled(flag: DiskLogLevel) -> bool {
    (LOG_LEVEL.load(Ordering::Relaxed) & flag.bits()) != 0
}

/// ニブルリングバッファ（最後のN個を保持）
pub struct NibbleRing {
    buf: Vec<u8>,
    pos: usize,
    capacity: usize,
}

impl NibbleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            pos: 0,
            capacity,
        }
    }

    pub fn push(&mut self, nibble: u8) {
        self.buf[self.pos % self.capacity] = nibble;
        self.pos += 1;
    }

    /// 最新からN個を取得（古い順）
    pub fn last_n(&self, n: usize) -> Vec<u8> {
        let n = n.min(self.capacity).min(self.pos);
        let mut result = Vec::with_capacity(n);
        for i in 0..n {
            let idx = (self.pos - n + i) % self.capacity;
            result.push(self.buf[idx]);
        }
        result
    }

    /// ダンプ出力
    pub fn dump(&self, n: usize) {
        if !is_enabled(DiskLogLevel::NIBBLE) {
            return;
        }
        let data = self.last_n(n);
        println!("[DUMP] Last {} nibbles:", data.len());
        for (i, b) in data.iter().enumerate() {
            print!("{:02X} ", b);
            if (i + 1) % 16 == 0 {
                println!();
            }
        }
        if data.len() % 16 != 0 {
            println!();
        }
    }
}

impl Default for NibbleRing {
    fn default() -> Self {
        Self::new(256)
    }
}

// ============================================================
// ログ出力関数
// ============================================================

/// [FLOW] モーターON
pub fn log_motor_on() {
    if is_enabled(DiskLogLevel::FLOW) {
        println!("[DISK] Motor ON");
    }
}

/// [FLOW] モーターOFF
pub fn log_motor_off() {
    if is_enabled(DiskLogLevel::FLOW) {
        println!("[DISK] Motor OFF");
    }
}

/// [DECIDE] スピンダウン予約
pub fn log_spin_down_scheduled() {
    if is_enabled(DiskLogLevel::DECIDE) {
        println!("[DISK] Spin-down scheduled");
    }
}

/// [DECIDE] スピンダウンキャンセル（発火前にモーターON）
pub fn log_spin_down_cancelled() {
    if is_enabled(DiskLogLevel::DECIDE) {
        println!("[DISK] Spin-down cancelled");
    }
}

/// [STATE] トラック変更（クォータートラック単位）
pub fn log_track_change(from: i32, to: i32) {
    if is_enabled(DiskLogLevel::STATE) {
        println!("[STATE] Track {} -> {} (quarter)", from, to);
    }
}

/// [STATE] ドライブ選択
pub fn log_drive_select(drive: usize) {
    if is_enabled(DiskLogLevel::STATE) {
        println!("[STATE] Drive {} selected", drive + 1);
    }
}

/// [FLOW] 同期マーク検出
pub fn log_sync_found(marker: &str, track: u8, pos: usize) {
    if is_enabled(DiskLogLevel::FLOW) {
        println!("[DISK] Sync {} at T={} pos={}", marker, track, pos);
    }
}

/// [FLOW] ディスク挿入
pub fn log_disk_inserted(drive: usize, name: &str) {
    if is_enabled(DiskLogLevel::FLOW) {
        println!("[DISK] Drive {}: inserted \"{}\"", drive + 1, name);
    }
}

/// [FLOW] ディスク取り出し
pub fn log_disk_ejected(drive: usize) {
    if is_enabled(DiskLogLevel::FLOW) {
        println!("[DISK] Drive {}: ejected", drive + 1);
    }
}

/// [DECIDE] MC3470のフェイクビット発生（ゼロ連続）
pub fn log_freak_out(zeros: u32) {
    if is_enabled(DiskLogLevel::DECIDE) {
        println!("[LSS] Fake bit after {} zeros", zeros);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_ring() {
        let mut ring = NibbleRing::new(8);
        for i in 0..10 {
            ring.push(i as u8);
        }
        let last4 = ring.last_n(4);
        assert_eq!(last4, vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_log_level() {
        set_log_level(DiskLogLevel::FLOW | DiskLogLevel::STATE);
        assert!(is_enabled(DiskLogLevel::FLOW));
        assert!(is_enabled(DiskLogLevel::STATE));
        assert!(!is_enabled(DiskLogLevel::DECIDE));
        assert!(!is_enabled(DiskLogLevel::NIBBLE));
        set_log_level(DiskLogLevel::empty());
    }
}
