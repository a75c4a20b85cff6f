//! Disk IIインターフェースカード
//!
//! ソフトスイッチ ($C0E0-$C0EF 相当、オフセット $80-$8F) のデコードと、
//! ステッパーによるヘッド移動、モーターOFFのスピンダウン遅延、ドライブ
//! 選択、ブートROMの公開を担当する。ビット/バイト単位の仕事はアクティブ
//! なドライバに委譲する。
//!
//! スピンダウンは実時間 (壁時計)、ヘッド移動はCPUサイクルという独立した
//! 2つの時計で動く。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::disk::{DiskError, FloppyDisk};
use crate::disk_log;
use crate::drive::Drive;
use crate::driver::{DiskDriver, DriverCtx, EmptyDriver};
use crate::nibble::NibbleDiskDriver;
use crate::rom::SectorMode;
use crate::savestate::{Disk2Snapshot, DriveSnapshot, CURRENT_VERSION};
use crate::woz::WozDiskDriver;

// ソフトスイッチオフセット
pub const LOC_PHASE0_OFF: u8 = 0x80;
pub const LOC_PHASE0_ON: u8 = 0x81;
pub const LOC_PHASE1_OFF: u8 = 0x82;
pub const LOC_PHASE1_ON: u8 = 0x83;
pub const LOC_PHASE2_OFF: u8 = 0x84;
pub const LOC_PHASE2_ON: u8 = 0x85;
pub const LOC_PHASE3_OFF: u8 = 0x86;
pub const LOC_PHASE3_ON: u8 = 0x87;
pub const LOC_DRIVE_OFF: u8 = 0x88;
pub const LOC_DRIVE_ON: u8 = 0x89;
pub const LOC_DRIVE1: u8 = 0x8A;
pub const LOC_DRIVE2: u8 = 0x8B;
pub const LOC_Q6_LOW: u8 = 0x8C;
pub const LOC_Q6_HIGH: u8 = 0x8D;
pub const LOC_READ_MODE: u8 = 0x8E;
pub const LOC_WRITE_MODE: u8 = 0x8F;

/// モーターOFF後のスピンダウン時間（実時間）
pub const MOTOR_OFF_DELAY: Duration = Duration::from_secs(1);

/// ステッパーフェーズ遷移によるクォータートラック移動量（×2して適用）
///
/// 対角0は移動なし、隣接±1はハーフトラック。実機のコイル重複通電や
/// ヘッド慣性は意図的に無視した簡易モデルで、互換性はこの表に対して
/// 調整されている。
const PHASE_DELTA: [[i32; 4]; 4] = [
    [0, 1, 2, -1],
    [-1, 0, 1, 2],
    [-2, -1, 0, 1],
    [1, -2, -1, 0],
];

/// 両ドライブで共有されるコントローラ状態
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerState {
    /// どのLSS ROMが適用されるか
    pub sectors: SectorMode,
    /// モーターON
    pub on: bool,
    /// 選択中ドライブ (0/1)
    pub drive_no: usize,
    /// LSSサブサイクルカウンタ (0..7)
    pub clock: u8,
    /// LSSステート (ROM行セレクタ、0..15)
    pub state: u8,
    /// シフト/ロード
    pub q6: bool,
    /// リード/ライトモード
    pub q7: bool,
    /// CPUに公開される8ビットシフトレジスタ
    pub latch: u8,
    /// CPUが最後に書いた値
    pub bus: u8,
}

impl ControllerState {
    pub fn new(sectors: SectorMode) -> Self {
        ControllerState {
            sectors,
            on: false,
            drive_no: 0,
            clock: 0,
            state: 0,
            q6: false,
            q7: false,
            latch: 0,
            bus: 0,
        }
    }
}

/// ホストUI向けの通知コールバック（同期呼び出し）
pub trait DiskObserver {
    fn drive_light(&mut self, _drive: usize, _on: bool) {}
    fn dirty(&mut self, _drive: usize, _dirty: bool) {}
    fn label(&mut self, _drive: usize, _name: &str, _side: Option<&str>) {}
}

/// 通知を捨てるオブザーバ
pub struct NullObserver;

impl DiskObserver for NullObserver {}

struct DriveSlot {
    drive: Drive,
    disk: FloppyDisk,
    driver: Box<dyn DiskDriver>,
}

impl DriveSlot {
    fn empty() -> Self {
        DriveSlot {
            drive: Drive::default(),
            disk: FloppyDisk::default(),
            driver: Box::new(EmptyDriver),
        }
    }
}

/// Disk IIインターフェースカード本体
pub struct Disk2InterfaceCard {
    slots: [DriveSlot; 2],
    shared: ControllerState,
    observer: Box<dyn DiskObserver>,
    /// スピンダウン予約（実時間）。モーターONでキャンセル
    motor_off_deadline: Option<Instant>,
    /// 最後に観測したCPUサイクル
    cycles: u64,
}

impl Disk2InterfaceCard {
    pub fn new(sectors: SectorMode) -> Self {
        Self::with_observer(sectors, Box::new(NullObserver))
    }

    pub fn with_observer(sectors: SectorMode, observer: Box<dyn DiskObserver>) -> Self {
        Disk2InterfaceCard {
            slots: [DriveSlot::empty(), DriveSlot::empty()],
            shared: ControllerState::new(sectors),
            observer,
            motor_off_deadline: None,
            cycles: 0,
        }
    }

    /// ソフトスイッチ読み出し
    pub fn io_read(&mut self, offset: u8, cycles: u64) -> u8 {
        self.access(offset, None, cycles)
    }

    /// ソフトスイッチ書き込み
    pub fn io_write(&mut self, offset: u8, value: u8, cycles: u64) {
        self.access(offset, Some(value), cycles);
    }

    /// 全ソフトスイッチの単一エントリポイント
    ///
    /// 未知のサブアドレスはエラーにせず黙って無視する（実機準拠）。
    fn access(&mut self, offset: u8, value: Option<u8>, cycles: u64) -> u8 {
        self.cycles = cycles;
        self.service_motor_off(Instant::now());

        let offset = offset & 0x8F;
        match offset {
            LOC_PHASE0_OFF..=LOC_PHASE3_ON => {
                self.set_phase((offset >> 1) & 3, offset & 1 != 0);
            }
            LOC_DRIVE_OFF => self.schedule_motor_off(Instant::now()),
            LOC_DRIVE_ON => self.motor_on(),
            LOC_DRIVE1 => self.select_drive(0),
            LOC_DRIVE2 => self.select_drive(1),
            LOC_Q6_LOW => {
                self.shared.q6 = false;
                self.with_active(|driver, ctx| driver.on_q6_low(ctx));
            }
            LOC_Q6_HIGH => {
                self.shared.q6 = true;
                let read_mode = value.is_none();
                self.with_active(|driver, ctx| driver.on_q6_high(ctx, read_mode));
            }
            LOC_READ_MODE => self.shared.q7 = false,
            LOC_WRITE_MODE => self.shared.q7 = true,
            _ => {}
        }

        // 読み出し結果はtick前のラッチ。偶数アドレスのみラッチが見える
        let result = if value.is_none() {
            if offset & 1 == 0 {
                self.shared.latch
            } else {
                0
            }
        } else {
            0
        };

        if let Some(v) = value {
            self.shared.bus = v;
        }

        // どのアクセスでもビットストリームは進み続ける
        self.with_active(|driver, ctx| driver.tick(ctx));

        result
    }

    /// フレームごとに呼ぶ。モーターOFF予約の消化とドライバの前進
    pub fn tick(&mut self, cycles: u64) {
        self.cycles = cycles;
        self.service_motor_off(Instant::now());
        self.with_active(|driver, ctx| driver.tick(ctx));
    }

    /// ステッパーコイルのON/OFF。モーターOFF中は効かない
    fn set_phase(&mut self, phase: u8, phase_on: bool) {
        if !self.shared.on {
            return;
        }
        if phase_on {
            let drive = &mut self.slots[self.shared.drive_no].drive;
            let old = drive.track;
            drive.track += PHASE_DELTA[drive.phase as usize][phase as usize] * 2;
            drive.phase = phase;
            if drive.track != old {
                disk_log::log_track_change(old, drive.track);
            }
        }
        // フェーズ変化のたびに有効範囲へ
        self.with_active(|driver, ctx| driver.clamp_track(ctx));
    }

    fn motor_on(&mut self) {
        if self.motor_off_deadline.take().is_some() {
            disk_log::log_spin_down_cancelled();
        }
        if !self.shared.on {
            self.shared.on = true;
            disk_log::log_motor_on();
            self.with_active(|driver, ctx| driver.on_drive_on(ctx));
            self.observer.drive_light(self.shared.drive_no, true);
        }
    }

    /// モーターOFFは機械的スピンダウンを模して遅延実行する
    fn schedule_motor_off(&mut self, now: Instant) {
        if self.shared.on && self.motor_off_deadline.is_none() {
            self.motor_off_deadline = Some(now + MOTOR_OFF_DELAY);
            disk_log::log_spin_down_scheduled();
        }
    }

    /// スピンダウン予約の期限チェック
    ///
    /// すべてのアクセスで呼ばれるほか、テストからは任意の時刻を渡せる。
    pub fn service_motor_off(&mut self, now: Instant) {
        if let Some(deadline) = self.motor_off_deadline {
            if now >= deadline {
                self.motor_off_deadline = None;
                if self.shared.on {
                    self.shared.on = false;
                    disk_log::log_motor_off();
                    self.with_active(|driver, ctx| driver.on_drive_off(ctx));
                    self.observer.drive_light(self.shared.drive_no, false);
                }
            }
        }
    }

    fn select_drive(&mut self, drive: usize) {
        let old = self.shared.drive_no;
        self.shared.drive_no = drive;
        if old != drive {
            disk_log::log_drive_select(drive);
        }
        if self.shared.on {
            self.observer.drive_light(old, false);
            self.observer.drive_light(drive, true);
        }
    }

    /// アクティブなドライバ呼び出しの共通経路
    ///
    /// ドライバ呼び出し中の可変借用を1か所に閉じ込め、呼び出し後に
    /// dirty通知を発火する。
    fn with_active<F>(&mut self, f: F)
    where
        F: FnOnce(&mut dyn DiskDriver, &mut DriverCtx),
    {
        let drive_no = self.shared.drive_no;
        let dirty = {
            let DriveSlot { drive, disk, driver } = &mut self.slots[drive_no];
            let mut ctx = DriverCtx {
                drive,
                disk,
                shared: &mut self.shared,
                selected: true,
                cycles: self.cycles,
                dirty: false,
            };
            f(driver.as_mut(), &mut ctx);
            ctx.dirty
        };
        if dirty {
            self.observer.dirty(drive_no, true);
        }
    }

    /// カードのブートROM読み出し
    pub fn read_rom(&self, offset: u8) -> u8 {
        self.shared.sectors.boot_rom()[offset as usize]
    }

    /// ROMは書き込み不可
    pub fn write_rom(&mut self, _offset: u8, _value: u8) {}

    /// リセット。モーターは遅延なしで即OFF
    pub fn reset(&mut self) {
        self.motor_off_deadline = None;
        if self.shared.on {
            self.shared.on = false;
            disk_log::log_motor_off();
            self.with_active(|driver, ctx| driver.on_drive_off(ctx));
            self.observer.drive_light(self.shared.drive_no, false);
        }
        self.shared.q7 = false;
        self.shared.drive_no = 0;
    }

    /// `cycles` は現在のCPUサイクル。WOZドライバのサイクル基準を
    /// ここで合わせないと、稼働中の挿入で経過分のLSSを一括実行してしまう
    fn driver_for(disk: &FloppyDisk, cycles: u64) -> Box<dyn DiskDriver> {
        match disk {
            FloppyDisk::None { .. } => Box::new(EmptyDriver),
            FloppyDisk::Nibble(_) => Box::new(NibbleDiskDriver::new()),
            FloppyDisk::Woz(_) => Box::new(WozDiskDriver::new(cycles)),
        }
    }

    /// ディスクの挿入。ドライバはディスク形状とセットで入れ替わる
    pub fn insert_disk(&mut self, drive_no: usize, disk: FloppyDisk) -> Result<(), DiskError> {
        let slot = self.slots.get_mut(drive_no).ok_or(DiskError::InvalidDrive(drive_no))?;
        slot.drive.head = 0;
        slot.drive.dirty = false;
        slot.drive.read_only = disk.is_write_protected();
        slot.driver = Self::driver_for(&disk, self.cycles);
        slot.disk = disk;

        if matches!(self.slots[drive_no].disk, FloppyDisk::Woz(_)) {
            // ステート2はシンクループ中間で、起動直後の疑似1ビットを避ける
            self.shared.state = 2;
            self.shared.clock = 0;
        }

        disk_log::log_disk_inserted(drive_no, self.slots[drive_no].disk.name());
        self.notify_disk(drive_no);
        Ok(())
    }

    /// ディスクの取り出し。取り出したディスクを返す
    pub fn eject_disk(&mut self, drive_no: usize) -> Result<FloppyDisk, DiskError> {
        let slot = self.slots.get_mut(drive_no).ok_or(DiskError::InvalidDrive(drive_no))?;
        let disk = std::mem::take(&mut slot.disk);
        slot.drive.head = 0;
        slot.drive.dirty = false;
        slot.drive.read_only = false;
        slot.driver = Box::new(EmptyDriver);

        disk_log::log_disk_ejected(drive_no);
        self.notify_disk(drive_no);
        Ok(disk)
    }

    fn notify_disk(&mut self, drive_no: usize) {
        let slot = &self.slots[drive_no];
        let metadata = slot.disk.metadata().clone();
        let dirty = slot.drive.dirty;
        self.observer.label(drive_no, &metadata.name, metadata.side.as_deref());
        self.observer.dirty(drive_no, dirty);
    }

    /// ライトプロテクトの切り替え（ホストUI向け）
    pub fn set_write_protected(&mut self, drive_no: usize, protected: bool) -> Result<(), DiskError> {
        let slot = self.slots.get_mut(drive_no).ok_or(DiskError::InvalidDrive(drive_no))?;
        slot.disk.set_write_protected(protected);
        slot.drive.read_only = protected;
        Ok(())
    }

    pub fn is_dirty(&self, drive_no: usize) -> bool {
        self.slots.get(drive_no).map_or(false, |s| s.drive.dirty)
    }

    pub fn is_motor_on(&self) -> bool {
        self.shared.on
    }

    pub fn selected_drive(&self) -> usize {
        self.shared.drive_no
    }

    pub fn controller_state(&self) -> &ControllerState {
        &self.shared
    }

    pub fn drive(&self, drive_no: usize) -> &Drive {
        &self.slots[drive_no].drive
    }

    pub fn disk(&self, drive_no: usize) -> &FloppyDisk {
        &self.slots[drive_no].disk
    }

    /// セクター読み出し（ニブルディスクのみ）
    pub fn read_sector(
        &self,
        drive_no: usize,
        track: usize,
        sector: usize,
    ) -> Result<[u8; 256], DiskError> {
        let slot = self.slots.get(drive_no).ok_or(DiskError::InvalidDrive(drive_no))?;
        slot.disk.read_sector(track, sector)
    }

    /// DSKイメージとしてのエクスポート（ニブルディスクのみ）
    pub fn export_dsk(&self, drive_no: usize) -> Result<Vec<u8>, DiskError> {
        let slot = self.slots.get(drive_no).ok_or(DiskError::InvalidDrive(drive_no))?;
        slot.disk.export_dsk()
    }

    /// スナップショットの取得
    pub fn get_state(&self) -> Disk2Snapshot {
        let drives = [0, 1].map(|i| {
            let slot = &self.slots[i];
            DriveSnapshot {
                disk: slot.disk.clone(),
                driver: slot.driver.snapshot(),
                drive: slot.drive.clone(),
            }
        });
        Disk2Snapshot {
            version: CURRENT_VERSION,
            controller: self.shared.clone(),
            drives,
        }
    }

    /// スナップショットからの復元
    ///
    /// ディスク形状に合ったドライバを再構築し、外部オブザーバが
    /// 再同期できるよう3種の通知をすべて再発火する。
    pub fn set_state(&mut self, snapshot: &Disk2Snapshot) {
        self.motor_off_deadline = None;

        for (i, snap) in snapshot.drives.iter().enumerate() {
            let slot = &mut self.slots[i];
            slot.drive = snap.drive.clone();
            slot.disk = snap.disk.clone();
            let mut driver = Self::driver_for(&slot.disk, self.cycles);
            driver.restore(&snap.driver);
            slot.driver = driver;
        }

        // 共有状態はドライバ再構築の後に書き戻す
        self.shared = snapshot.controller.clone();

        for i in 0..2 {
            let on = self.shared.on && self.shared.drive_no == i;
            self.observer.drive_light(i, on);
            let slot = &self.slots[i];
            let metadata = slot.disk.metadata().clone();
            let dirty = slot.drive.dirty;
            self.observer.label(i, &metadata.name, metadata.side.as_deref());
            self.observer.dirty(i, dirty);
        }
    }
}
