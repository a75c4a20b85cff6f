//! GCRエンコーディング
//!
//! DSK/POイメージからニブルトラックを合成するための6-and-2 / 4-and-4
//! エンコードと、エクスポート用のデコード。トラックレイアウトは
//! DOS 3.3標準（GAP1 48バイト、アドレス/データフィールド、GAP2/GAP3）。

use crate::disk::{BYTES_PER_SECTOR, BYTES_PER_TRACK, NIB_TRACK_SIZE, SECTORS_PER_TRACK};

/// 6-and-2 ニブル変換テーブル（ディスクバイト）
pub const WRITE_TABLE: [u8; 64] = [
    0x96, 0x97, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F, 0xA6,
    0xA7, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB2, 0xB3,
    0xB4, 0xB5, 0xB6, 0xB7, 0xB9, 0xBA, 0xBB, 0xBC,
    0xBD, 0xBE, 0xBF, 0xCB, 0xCD, 0xCE, 0xCF, 0xD3,
    0xD6, 0xD7, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
    0xDF, 0xE5, 0xE6, 0xE7, 0xE9, 0xEA, 0xEB, 0xEC,
    0xED, 0xEE, 0xEF, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6,
    0xF7, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

/// WRITE_TABLEの逆引き
const READ_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 64 {
        table[WRITE_TABLE[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// DOS 3.3セクターインターリーブ
pub const DOS_SECTOR_ORDER: [usize; 16] = [0, 7, 14, 6, 13, 5, 12, 4, 11, 3, 10, 2, 9, 1, 8, 15];

/// ProDOSセクターオーダー
pub const PRODOS_SECTOR_ORDER: [usize; 16] = [0, 8, 1, 9, 2, 10, 3, 11, 4, 12, 5, 13, 6, 14, 7, 15];

/// デフォルトのボリューム番号
pub const DEFAULT_VOLUME: u8 = 254;

/// 4-and-4エンコード
///
/// byte1 = 上位ビット (D7,D5,D3,D1) + 0xAA、byte2 = 下位ビット + 0xAA
#[inline]
fn encode_44(v: u8) -> (u8, u8) {
    ((v >> 1) | 0xAA, v | 0xAA)
}

/// 4-and-4デコード
#[inline]
fn decode_44(odd: u8, even: u8) -> u8 {
    ((odd & 0x55) << 1) | (even & 0x55)
}

/// セクター256バイトを6-and-2エンコードする（343バイト）
pub fn encode_sector_62(data: &[u8]) -> [u8; 343] {
    let mut aux = [0u8; 86];
    let mut result = [0u8; 343];

    // 補助バッファを構築（下位2ビットを収集）
    // P5 PROMは LSR; ROL; LSR; ROL でデコードするので、元データの
    // D1,D0 を入れ替えた (D0 << 1) | D1 を格納する
    for i in 0..86 {
        let a = ((data[i] & 0x01) << 1) | ((data[i] & 0x02) >> 1);
        let b = if i + 86 < 256 {
            ((data[i + 86] & 0x01) << 3) | ((data[i + 86] & 0x02) << 1)
        } else {
            0
        };
        let c = if i + 172 < 256 {
            ((data[i + 172] & 0x01) << 5) | ((data[i + 172] & 0x02) << 3)
        } else {
            0
        };
        aux[85 - i] = a | b | c;
    }

    // XORチェインでエンコード: 補助86バイト（逆順）+ メイン256バイト + チェックサム
    let mut pos = 0;
    let mut checksum = 0u8;
    for i in (0..86).rev() {
        let val = aux[i];
        result[pos] = WRITE_TABLE[((val ^ checksum) & 0x3F) as usize];
        checksum = val;
        pos += 1;
    }
    for i in 0..256 {
        let val = data[i] >> 2;
        result[pos] = WRITE_TABLE[((val ^ checksum) & 0x3F) as usize];
        checksum = val;
        pos += 1;
    }
    result[pos] = WRITE_TABLE[(checksum & 0x3F) as usize];

    result
}

/// 6-and-2エンコードされたデータ（343バイト以上）をデコードする
pub fn decode_sector_62(encoded: &[u8]) -> Option<[u8; 256]> {
    if encoded.len() < 343 {
        return None;
    }

    let mut aux = [0u8; 86];
    let mut data = [0u8; 256];

    // XORチェインを巻き戻す
    let mut prev = 0u8;
    for i in 0..86 {
        let code = encoded[i];
        if code < 0x96 {
            return None;
        }
        aux[i] = READ_TABLE[code as usize] ^ prev;
        prev = aux[i];
    }
    for i in 0..256 {
        let code = encoded[86 + i];
        if code < 0x96 {
            return None;
        }
        data[i] = READ_TABLE[code as usize] ^ prev;
        prev = data[i];
    }

    // 補助ビットを結合（格納時に入れ替えた D1,D0 を元に戻す）
    for i in 0..256 {
        let chunk = aux[i % 86] >> ((i / 86) * 2);
        let low = ((chunk & 0x01) << 1) | ((chunk & 0x02) >> 1);
        data[i] = (data[i] << 2) | low;
    }

    Some(data)
}

/// DSKトラック1本（4096バイト）からニブルトラックを合成する
///
/// `sector_order` は物理セクター→イメージ内論理セクターのインターリーブ。
/// アドレスフィールドには物理セクター番号が書かれる。
/// 末尾の余りはシンクバイトで埋める。
pub fn nibblize_track(track: usize, volume: u8, track_bytes: &[u8], sector_order: &[usize; 16]) -> Vec<u8> {
    debug_assert_eq!(track_bytes.len(), BYTES_PER_TRACK);
    let mut nib = Vec::with_capacity(NIB_TRACK_SIZE);

    // GAP1 - トラック先頭の同期バイト
    nib.resize(48, 0xFF);

    for phys in 0..SECTORS_PER_TRACK {
        let logical = sector_order[phys];
        let offset = logical * BYTES_PER_SECTOR;

        // アドレスフィールド
        nib.extend_from_slice(&[0xD5, 0xAA, 0x96]);
        for v in [volume, track as u8, phys as u8, volume ^ track as u8 ^ phys as u8] {
            let (odd, even) = encode_44(v);
            nib.push(odd);
            nib.push(even);
        }
        nib.extend_from_slice(&[0xDE, 0xAA, 0xEB]);

        // GAP2
        nib.resize(nib.len() + 6, 0xFF);

        // データフィールド
        nib.extend_from_slice(&[0xD5, 0xAA, 0xAD]);
        nib.extend_from_slice(&encode_sector_62(&track_bytes[offset..offset + BYTES_PER_SECTOR]));
        nib.extend_from_slice(&[0xDE, 0xAA, 0xEB]);

        // GAP3
        nib.resize(nib.len() + 27, 0xFF);
    }

    nib.resize(NIB_TRACK_SIZE, 0xFF);
    nib
}

/// ニブルトラックから物理セクターを探してデコードする
pub fn decode_sector(nib_track: &[u8], target_sector: usize) -> Option<[u8; 256]> {
    let mut pos = 0;
    while pos + 10 < nib_track.len() {
        // アドレスフィールドマーカー (D5 AA 96)
        if nib_track[pos] == 0xD5 && nib_track[pos + 1] == 0xAA && nib_track[pos + 2] == 0x96 {
            let sector = decode_44(nib_track[pos + 7], nib_track[pos + 8]);
            if sector as usize == target_sector {
                // データフィールドマーカー (D5 AA AD) を探す
                let mut data_pos = pos + 10;
                while data_pos + 345 < nib_track.len() {
                    if nib_track[data_pos] == 0xD5
                        && nib_track[data_pos + 1] == 0xAA
                        && nib_track[data_pos + 2] == 0xAD
                    {
                        return decode_sector_62(&nib_track[data_pos + 3..]);
                    }
                    data_pos += 1;
                }
                return None;
            }
        }
        pos += 1;
    }
    None
}
