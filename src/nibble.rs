//! ニブルディスクドライバ
//!
//! バイト粒度のGCRニブルアクセス。コントローラの「準備完了/未完了」の
//! 交互リズムを `skip` トグルでモデル化し、準備未完了の読み出しでは
//! ラッチに0を返す（ソフトウェアはこの0を待ちニブルとして読み飛ばす）。

use crate::disk::FloppyDisk;
use crate::disk_log;
use crate::driver::{DiskDriver, DriverCtx};
use crate::savestate::DriverSnapshot;

pub struct NibbleDiskDriver {
    /// 交互リズムのトグル (0/1)
    skip: u8,
    /// 読み出したニブル数（診断用）
    nibble_count: u32,
    /// 直近のニブル列（NIBBLEログ用）
    ring: disk_log::NibbleRing,
    /// 同期マーク検出用の直前2ニブル
    last: [u8; 2],
}

impl NibbleDiskDriver {
    pub fn new() -> Self {
        NibbleDiskDriver {
            skip: 0,
            nibble_count: 0,
            ring: disk_log::NibbleRing::default(),
            last: [0; 2],
        }
    }

    pub fn nibble_count(&self) -> u32 {
        self.nibble_count
    }

    fn observe_nibble(&mut self, nibble: u8, track: usize, pos: usize) {
        self.ring.push(nibble);
        if self.last == [0xD5, 0xAA] && nibble == 0x96 {
            disk_log::log_sync_found("D5AA96", track as u8, pos);
        }
        self.last = [self.last[1], nibble];
    }
}

impl Default for NibbleDiskDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskDriver for NibbleDiskDriver {
    fn on_q6_low(&mut self, ctx: &mut DriverCtx) {
        if ctx.is_on() && (self.skip != 0 || ctx.shared.q7) {
            if let FloppyDisk::Nibble(disk) = ctx.disk {
                let track_idx = ctx.drive.whole_track().min(disk.tracks.len() - 1);
                let track = &mut disk.tracks[track_idx];
                if !track.is_empty() {
                    if ctx.drive.head >= track.len() {
                        ctx.drive.head = 0;
                    }
                    if ctx.shared.q7 {
                        if !ctx.drive.read_only {
                            track[ctx.drive.head] = ctx.shared.bus;
                            ctx.drive.dirty = true;
                            ctx.dirty = true;
                        }
                    } else {
                        let nibble = track[ctx.drive.head];
                        ctx.shared.latch = nibble;
                        self.nibble_count = self.nibble_count.wrapping_add(1);
                        self.observe_nibble(nibble, track_idx, ctx.drive.head);
                    }
                    ctx.drive.head += 1;
                }
            }
        } else {
            ctx.shared.latch = 0;
        }
        self.skip ^= 1;
    }

    fn on_q6_high(&mut self, ctx: &mut DriverCtx, read_mode: bool) {
        if read_mode && !ctx.shared.q7 {
            if ctx.write_protected() {
                // ライトプロテクトのプローブ: シフトしても上位ビットが落ちない
                ctx.shared.latch = 0xFF;
            } else {
                ctx.shared.latch >>= 1;
            }
        }
    }

    fn on_drive_on(&mut self, _ctx: &mut DriverCtx) {
        self.nibble_count = 0;
    }

    fn clamp_track(&mut self, ctx: &mut DriverCtx) {
        ctx.drive.track = ctx.drive.track.clamp(0, 35 * 4 - 1);
    }

    fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot::Nibble {
            skip: self.skip,
            nibble_count: self.nibble_count,
        }
    }

    fn restore(&mut self, snapshot: &DriverSnapshot) {
        if let DriverSnapshot::Nibble { skip, nibble_count } = snapshot {
            self.skip = *skip;
            self.nibble_count = *nibble_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerState;
    use crate::disk::{NibbleDisk, DSK_SIZE};
    use crate::drive::Drive;
    use crate::rom::SectorMode;

    struct Rig {
        drive: Drive,
        disk: FloppyDisk,
        shared: ControllerState,
        driver: NibbleDiskDriver,
    }

    impl Rig {
        fn new() -> Self {
            let data = vec![0u8; DSK_SIZE];
            let disk = NibbleDisk::from_dsk_bytes("test.dsk", &data, false).unwrap();
            let mut shared = ControllerState::new(SectorMode::Sector16);
            shared.on = true;
            Rig {
                drive: Drive::default(),
                disk: FloppyDisk::Nibble(disk),
                shared,
                driver: NibbleDiskDriver::new(),
            }
        }

        fn q6_low(&mut self) -> (u8, bool) {
            let mut ctx = DriverCtx {
                drive: &mut self.drive,
                disk: &mut self.disk,
                shared: &mut self.shared,
                selected: true,
                cycles: 0,
                dirty: false,
            };
            self.driver.on_q6_low(&mut ctx);
            let dirty = ctx.dirty;
            (self.shared.latch, dirty)
        }

        /// 待ちニブルを飛ばして次のデータニブルを読む
        fn read_nibble(&mut self) -> u8 {
            let (first, _) = self.q6_low();
            if self.driver.skip == 0 {
                // トグルが既にデータ側だった
                return first;
            }
            self.q6_low().0
        }
    }

    #[test]
    fn test_read_alternates_wait_and_data() {
        let mut rig = Rig::new();
        // skip=0 の最初の呼び出しは待ちニブル
        let (latch, _) = rig.q6_low();
        assert_eq!(latch, 0);
        // 次はトラック先頭のシンクバイト
        let (latch, _) = rig.q6_low();
        assert_eq!(latch, 0xFF);
        assert_eq!(rig.drive.head, 1);
    }

    #[test]
    fn test_read_reaches_address_prolog() {
        let mut rig = Rig::new();
        let first = rig.read_nibble();
        // 1トラック分読む間に先頭と異なるニブルが現れる
        let mut varied = false;
        for _ in 0..7000 {
            if rig.read_nibble() != first {
                varied = true;
                break;
            }
        }
        assert!(varied);
    }

    #[test]
    fn test_write_stores_bus_and_marks_dirty() {
        let mut rig = Rig::new();
        rig.shared.q7 = true;
        rig.shared.bus = 0xD5;
        let head_before = rig.drive.head;
        let (_, dirty) = rig.q6_low();
        assert!(dirty);
        assert!(rig.drive.dirty);
        assert_eq!(rig.drive.head, head_before + 1);
        if let FloppyDisk::Nibble(disk) = &rig.disk {
            assert_eq!(disk.tracks[0][head_before], 0xD5);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_write_protect_rejects_write() {
        let mut rig = Rig::new();
        rig.drive.read_only = true;
        rig.shared.q7 = true;
        rig.shared.bus = 0xD5;
        let (_, dirty) = rig.q6_low();
        assert!(!dirty);
        assert!(!rig.drive.dirty);
        if let FloppyDisk::Nibble(disk) = &rig.disk {
            assert_eq!(disk.tracks[0][0], 0xFF);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_write_protect_forces_latch_on_q6_high() {
        let mut rig = Rig::new();
        rig.drive.read_only = true;
        rig.shared.latch = 0x12;
        let mut ctx = DriverCtx {
            drive: &mut rig.drive,
            disk: &mut rig.disk,
            shared: &mut rig.shared,
            selected: true,
            cycles: 0,
            dirty: false,
        };
        rig.driver.on_q6_high(&mut ctx, true);
        assert_eq!(rig.shared.latch, 0xFF);
    }

    #[test]
    fn test_q6_high_shifts_latch_when_writable() {
        let mut rig = Rig::new();
        rig.shared.latch = 0x80;
        let mut ctx = DriverCtx {
            drive: &mut rig.drive,
            disk: &mut rig.disk,
            shared: &mut rig.shared,
            selected: true,
            cycles: 0,
            dirty: false,
        };
        rig.driver.on_q6_high(&mut ctx, true);
        assert_eq!(rig.shared.latch, 0x40);
    }

    #[test]
    fn test_motor_off_forces_zero_latch() {
        let mut rig = Rig::new();
        rig.shared.on = false;
        rig.shared.latch = 0x55;
        let (latch, _) = rig.q6_low();
        assert_eq!(latch, 0);
        assert_eq!(rig.drive.head, 0);
    }
}
