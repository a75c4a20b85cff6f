//! ディスクドライバの共通インターフェース
//!
//! ドライバは自分専用の状態だけを持ち、`Drive` / `FloppyDisk` /
//! `ControllerState` へのアクセスは毎回 `DriverCtx` 経由で借りる。
//! 所有権はすべてコントローラ側にあり、エイリアスした可変参照を作らない。

use crate::controller::ControllerState;
use crate::disk::FloppyDisk;
use crate::drive::Drive;
use crate::savestate::DriverSnapshot;

/// ドライバ呼び出し1回分のコンテキスト
pub struct DriverCtx<'a> {
    pub drive: &'a mut Drive,
    pub disk: &'a mut FloppyDisk,
    pub shared: &'a mut ControllerState,
    /// このドライブがドライブセレクトされているか
    pub selected: bool,
    /// CPUの単調増加サイクルカウンタ
    pub cycles: u64,
    /// この呼び出しでトラックデータが書き換わったか
    /// （コントローラが呼び出し後にdirty通知を発火する）
    pub dirty: bool,
}

impl DriverCtx<'_> {
    /// モーターONかつこのドライブが選択されている
    #[inline]
    pub fn is_on(&self) -> bool {
        self.shared.on && self.selected
    }

    #[inline]
    pub fn write_protected(&self) -> bool {
        self.drive.read_only
    }
}

/// ドライバ共通のケーパビリティ
///
/// ディスクのエンコーディングとドライバ種別は挿入時に必ずセットで
/// 入れ替わる。
pub trait DiskDriver {
    /// 毎アクセス後に呼ばれる。WOZドライバはここでビットストリームを進める。
    fn tick(&mut self, _ctx: &mut DriverCtx) {}

    /// Q6L ($C08C): シフトモード
    fn on_q6_low(&mut self, _ctx: &mut DriverCtx) {}

    /// Q6H ($C08D): ロードモード
    fn on_q6_high(&mut self, _ctx: &mut DriverCtx, _read_mode: bool) {}

    fn on_drive_on(&mut self, _ctx: &mut DriverCtx) {}

    fn on_drive_off(&mut self, _ctx: &mut DriverCtx) {}

    /// フェーズ変化後にトラック位置を有効範囲へクランプする
    fn clamp_track(&mut self, ctx: &mut DriverCtx);

    /// セーブステート用のドライバ固有状態
    fn snapshot(&self) -> DriverSnapshot;

    fn restore(&mut self, snapshot: &DriverSnapshot);
}

/// メディアなしのドライバ
///
/// ヘッドは機械的には公称35トラックの少し先まで動ける。
#[derive(Debug, Default)]
pub struct EmptyDriver;

impl DiskDriver for EmptyDriver {
    fn clamp_track(&mut self, ctx: &mut DriverCtx) {
        ctx.drive.track = ctx.drive.track.clamp(0, 34 * 4);
    }

    fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot::Empty
    }

    fn restore(&mut self, _snapshot: &DriverSnapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::SectorMode;

    #[test]
    fn test_empty_driver_clamps_track() {
        let mut drive = Drive::default();
        let mut disk = FloppyDisk::default();
        let mut shared = ControllerState::new(SectorMode::Sector16);
        let mut driver = EmptyDriver;

        drive.track = 500;
        let mut ctx = DriverCtx {
            drive: &mut drive,
            disk: &mut disk,
            shared: &mut shared,
            selected: true,
            cycles: 0,
            dirty: false,
        };
        driver.clamp_track(&mut ctx);
        assert_eq!(drive.track, 34 * 4);

        drive.track = -3;
        let mut ctx = DriverCtx {
            drive: &mut drive,
            disk: &mut disk,
            shared: &mut shared,
            selected: true,
            cycles: 0,
            dirty: false,
        };
        driver.clamp_track(&mut ctx);
        assert_eq!(drive.track, 0);
    }
}
