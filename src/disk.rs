//! ディスクイメージモデル
//!
//! ドライブに挿入されるメディアを表す。ニブルイメージ (DSK/PO/NIB) は
//! トラックごとのニブル列、ビットストリームイメージ (WOZ) はクォーター
//! トラックマップと生ビット列を持つ。WOZコンテナのパース自体は外部
//! コラボレータで、ここでは展開済みのデータを受け取るだけ。

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gcr;

/// 標準的な5.25インチイメージのジオメトリ
pub const TRACKS: usize = 35;
pub const SECTORS_PER_TRACK: usize = 16;
pub const BYTES_PER_SECTOR: usize = 256;
pub const BYTES_PER_TRACK: usize = SECTORS_PER_TRACK * BYTES_PER_SECTOR;
pub const DSK_SIZE: usize = TRACKS * BYTES_PER_TRACK; // 143360 bytes

/// NIBフォーマットの定数
pub const NIB_TRACK_SIZE: usize = 6656;
pub const NIB_SIZE: usize = TRACKS * NIB_TRACK_SIZE; // 232960 bytes

/// クォータートラックマップのエントリ数 (40トラック × 4)
pub const QUARTER_TRACKS: usize = 160;

/// ディスクサブシステムのエラー
#[derive(Debug, Error)]
pub enum DiskError {
    /// セクター単位の操作をビットストリームディスク等に適用した
    #[error("operation not supported for this disk encoding")]
    UnsupportedEncoding,

    /// イメージサイズが合わない
    #[error("invalid image size: got {got} bytes, expected {expected}")]
    InvalidImageSize { got: usize, expected: usize },

    /// ドライブ番号が範囲外
    #[error("invalid drive number: {0}")]
    InvalidDrive(usize),

    /// セクターが見つからない（デコード失敗を含む）
    #[error("sector not found: track {track} sector {sector}")]
    SectorNotFound { track: usize, sector: usize },
}

/// ディスクのエンコーディング種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// メディアなし
    None,
    /// バイト粒度のGCRニブル
    Nibble,
    /// フラックス遷移サンプルのビットストリーム
    Bitstream,
}

/// 元イメージのファイル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskFormat {
    /// DOS 3.3セクターオーダー (.dsk/.do)
    Do,
    /// ProDOSセクターオーダー (.po)
    Po,
    /// 生ニブル (.nib)
    Nib,
    /// 13セクター (.d13)
    D13,
    /// ビットストリームコンテナ (.woz)
    Woz,
}

/// イメージのメタデータ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskMetadata {
    /// 表示名（通常はファイル名）
    pub name: String,
    /// 両面メディアの面ラベル
    pub side: Option<String>,
}

impl DiskMetadata {
    pub fn new(name: &str) -> Self {
        DiskMetadata { name: name.to_string(), side: None }
    }
}

/// ニブルディスク
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NibbleDisk {
    pub metadata: DiskMetadata,
    pub format: DiskFormat,
    /// アドレスフィールドに書かれるボリューム番号
    pub volume: u8,
    /// トラックごとのニブル列
    pub tracks: Vec<Vec<u8>>,
    pub read_only: bool,
}

impl NibbleDisk {
    /// DOS 3.3オーダーのセクターイメージから構築する
    pub fn from_dsk_bytes(name: &str, data: &[u8], read_only: bool) -> Result<Self, DiskError> {
        Self::from_sector_image(name, data, read_only, DiskFormat::Do, &gcr::DOS_SECTOR_ORDER)
    }

    /// ProDOSオーダーのセクターイメージから構築する
    pub fn from_po_bytes(name: &str, data: &[u8], read_only: bool) -> Result<Self, DiskError> {
        Self::from_sector_image(name, data, read_only, DiskFormat::Po, &gcr::PRODOS_SECTOR_ORDER)
    }

    fn from_sector_image(
        name: &str,
        data: &[u8],
        read_only: bool,
        format: DiskFormat,
        sector_order: &[usize; 16],
    ) -> Result<Self, DiskError> {
        if data.len() != DSK_SIZE {
            return Err(DiskError::InvalidImageSize { got: data.len(), expected: DSK_SIZE });
        }

        let mut tracks = Vec::with_capacity(TRACKS);
        for track in 0..TRACKS {
            let offset = track * BYTES_PER_TRACK;
            tracks.push(gcr::nibblize_track(
                track,
                gcr::DEFAULT_VOLUME,
                &data[offset..offset + BYTES_PER_TRACK],
                sector_order,
            ));
        }

        info!("disk image loaded: {} ({:?}, {} tracks)", name, format, TRACKS);
        Ok(NibbleDisk {
            metadata: DiskMetadata::new(name),
            format,
            volume: gcr::DEFAULT_VOLUME,
            tracks,
            read_only,
        })
    }

    /// 生ニブルイメージから構築する
    pub fn from_nib_bytes(name: &str, data: &[u8], read_only: bool) -> Result<Self, DiskError> {
        if data.len() != NIB_SIZE {
            return Err(DiskError::InvalidImageSize { got: data.len(), expected: NIB_SIZE });
        }

        let tracks = data.chunks_exact(NIB_TRACK_SIZE).map(|c| c.to_vec()).collect();

        info!("nibble image loaded: {} ({} tracks)", name, TRACKS);
        Ok(NibbleDisk {
            metadata: DiskMetadata::new(name),
            format: DiskFormat::Nib,
            volume: gcr::DEFAULT_VOLUME,
            tracks,
            read_only,
        })
    }

    /// このイメージのセクターインターリーブ
    fn sector_order(&self) -> &'static [usize; 16] {
        match self.format {
            DiskFormat::Po => &gcr::PRODOS_SECTOR_ORDER,
            _ => &gcr::DOS_SECTOR_ORDER,
        }
    }

    /// 論理セクターをデコードして返す
    pub fn read_sector(&self, track: usize, sector: usize) -> Result<[u8; 256], DiskError> {
        if track >= self.tracks.len() || sector >= SECTORS_PER_TRACK {
            return Err(DiskError::SectorNotFound { track, sector });
        }
        // 物理セクター番号に変換してから探す
        let order = self.sector_order();
        let phys = (0..SECTORS_PER_TRACK)
            .find(|&p| order[p] == sector)
            .ok_or(DiskError::SectorNotFound { track, sector })?;
        gcr::decode_sector(&self.tracks[track], phys)
            .ok_or(DiskError::SectorNotFound { track, sector })
    }

    /// DOS 3.3オーダーのセクターイメージとして書き出す
    pub fn export_dsk(&self) -> Result<Vec<u8>, DiskError> {
        let mut dsk = vec![0u8; DSK_SIZE];
        let order = self.sector_order();
        for track in 0..TRACKS.min(self.tracks.len()) {
            for phys in 0..SECTORS_PER_TRACK {
                let logical = order[phys];
                let data = gcr::decode_sector(&self.tracks[track], phys)
                    .ok_or(DiskError::SectorNotFound { track, sector: logical })?;
                let offset = track * BYTES_PER_TRACK + logical * BYTES_PER_SECTOR;
                dsk[offset..offset + BYTES_PER_SECTOR].copy_from_slice(&data);
            }
        }
        Ok(dsk)
    }
}

/// WOZコンテナのINFOチャンク相当
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WozInfo {
    pub version: u8,
    pub disk_type: u8,
    pub synchronized: bool,
    pub write_protected: bool,
    /// 最適ビットタイミング（125ns単位）
    pub optimal_bit_timing: u8,
}

/// ビットストリームディスク
///
/// `raw_tracks` の各要素は1ビットを1バイト (0/1) で持つ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WozDisk {
    pub metadata: DiskMetadata,
    pub info: WozInfo,
    /// クォータートラック → raw_tracksインデックス
    pub track_map: Vec<Option<u8>>,
    pub raw_tracks: Vec<Vec<u8>>,
    pub read_only: bool,
}

impl WozDisk {
    /// 展開済みのトラックマップとビット列から構築する
    pub fn new(
        name: &str,
        info: WozInfo,
        track_map: Vec<Option<u8>>,
        raw_tracks: Vec<Vec<u8>>,
    ) -> Result<Self, DiskError> {
        if track_map.len() != QUARTER_TRACKS {
            return Err(DiskError::InvalidImageSize {
                got: track_map.len(),
                expected: QUARTER_TRACKS,
            });
        }
        let read_only = info.write_protected;
        Ok(WozDisk {
            metadata: DiskMetadata::new(name),
            info,
            track_map,
            raw_tracks,
            read_only,
        })
    }

    /// クォータートラック位置のビット列を返す
    pub fn bits_for_quarter_track(&self, quarter_track: usize) -> Option<&[u8]> {
        let index = (*self.track_map.get(quarter_track)?)?;
        self.raw_tracks.get(index as usize).map(|t| t.as_slice())
    }
}

/// ドライブに入っているメディア
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FloppyDisk {
    /// メディアなし
    None { metadata: DiskMetadata, read_only: bool },
    Nibble(NibbleDisk),
    Woz(WozDisk),
}

impl Default for FloppyDisk {
    fn default() -> Self {
        FloppyDisk::None { metadata: DiskMetadata::default(), read_only: false }
    }
}

impl FloppyDisk {
    pub fn encoding(&self) -> Encoding {
        match self {
            FloppyDisk::None { .. } => Encoding::None,
            FloppyDisk::Nibble(_) => Encoding::Nibble,
            FloppyDisk::Woz(_) => Encoding::Bitstream,
        }
    }

    pub fn metadata(&self) -> &DiskMetadata {
        match self {
            FloppyDisk::None { metadata, .. } => metadata,
            FloppyDisk::Nibble(disk) => &disk.metadata,
            FloppyDisk::Woz(disk) => &disk.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn is_write_protected(&self) -> bool {
        match self {
            FloppyDisk::None { read_only, .. } => *read_only,
            FloppyDisk::Nibble(disk) => disk.read_only,
            FloppyDisk::Woz(disk) => disk.read_only,
        }
    }

    pub fn set_write_protected(&mut self, protected: bool) {
        match self {
            FloppyDisk::None { read_only, .. } => *read_only = protected,
            FloppyDisk::Nibble(disk) => disk.read_only = protected,
            FloppyDisk::Woz(disk) => disk.read_only = protected,
        }
    }

    /// 論理セクターの読み出し（ニブルディスクのみ）
    pub fn read_sector(&self, track: usize, sector: usize) -> Result<[u8; 256], DiskError> {
        match self {
            FloppyDisk::Nibble(disk) => disk.read_sector(track, sector),
            _ => Err(DiskError::UnsupportedEncoding),
        }
    }

    /// DSKイメージとしてのエクスポート（ニブルディスクのみ）
    pub fn export_dsk(&self) -> Result<Vec<u8>, DiskError> {
        match self {
            FloppyDisk::Nibble(disk) => disk.export_dsk(),
            _ => Err(DiskError::UnsupportedEncoding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dsk() -> Vec<u8> {
        let mut data = vec![0u8; DSK_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = ((i / 7) % 256) as u8;
        }
        data
    }

    #[test]
    fn test_dsk_size_validation() {
        let err = NibbleDisk::from_dsk_bytes("bad.dsk", &[0u8; 1000], false).unwrap_err();
        match err {
            DiskError::InvalidImageSize { got, expected } => {
                assert_eq!(got, 1000);
                assert_eq!(expected, DSK_SIZE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nib_size_validation() {
        assert!(NibbleDisk::from_nib_bytes("bad.nib", &[0u8; NIB_SIZE - 1], false).is_err());
        assert!(NibbleDisk::from_nib_bytes("ok.nib", &vec![0xFFu8; NIB_SIZE], false).is_ok());
    }

    #[test]
    fn test_dsk_roundtrip() {
        let data = sample_dsk();
        let disk = NibbleDisk::from_dsk_bytes("test.dsk", &data, false).unwrap();
        assert_eq!(disk.tracks.len(), TRACKS);
        assert_eq!(disk.tracks[0].len(), NIB_TRACK_SIZE);
        assert_eq!(disk.export_dsk().unwrap(), data);
    }

    #[test]
    fn test_po_read_sector() {
        let data = sample_dsk();
        let disk = NibbleDisk::from_po_bytes("test.po", &data, false).unwrap();
        let sector = disk.read_sector(3, 5).unwrap();
        let offset = 3 * BYTES_PER_TRACK + 5 * BYTES_PER_SECTOR;
        assert_eq!(sector[..], data[offset..offset + BYTES_PER_SECTOR]);
    }

    #[test]
    fn test_woz_rejects_sector_operations() {
        let woz = WozDisk::new(
            "test.woz",
            WozInfo::default(),
            vec![None; QUARTER_TRACKS],
            Vec::new(),
        )
        .unwrap();
        let disk = FloppyDisk::Woz(woz);
        assert!(matches!(disk.read_sector(0, 0), Err(DiskError::UnsupportedEncoding)));
        assert!(matches!(disk.export_dsk(), Err(DiskError::UnsupportedEncoding)));
    }

    #[test]
    fn test_track_map_length_validated() {
        assert!(WozDisk::new("t.woz", WozInfo::default(), vec![None; 10], Vec::new()).is_err());
    }
}
