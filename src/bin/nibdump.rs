//! nibdump - ディスクイメージのニブルストリーム検査ツール
//!
//! イメージをカードに挿入し、ソフトスイッチだけを使ってヘッドを
//! 目的トラックへ動かし、ドライブが返すニブル列をダンプする。

use clap::Parser;
use std::error::Error;
use std::fs;

use disk2rs::controller::{Disk2InterfaceCard, LOC_DRIVE_ON, LOC_Q6_LOW};
use disk2rs::disk::{FloppyDisk, NibbleDisk};
use disk2rs::disk_log;
use disk2rs::rom::SectorMode;

#[derive(Parser, Debug)]
#[command(name = "nibdump")]
#[command(version = "0.2.0")]
#[command(about = "Disk II nibble stream inspector", long_about = None)]
struct Args {
    /// ディスクイメージファイル (.dsk/.do/.po/.nib)
    image: String,

    /// ダンプするトラック
    #[arg(short, long, default_value = "0")]
    track: usize,

    /// ダンプするニブル数
    #[arg(short, long, default_value = "256")]
    count: usize,

    /// ニブルの代わりに指定セクターをデコードして表示
    #[arg(short, long)]
    sector: Option<usize>,

    /// DSK形式でエクスポートして保存するパス
    #[arg(long)]
    export: Option<String>,

    /// カード状態のJSONダンプを保存するパス
    #[arg(long)]
    state_dump: Option<String>,

    /// ディスクログレベル: none, flow, state, decide, nibble, all
    /// 複数指定可: flow+state
    #[arg(long, default_value = "none")]
    disk_log: String,
}

fn parse_disk_log_level(s: &str) -> disk_log::DiskLogLevel {
    let mut level = disk_log::DiskLogLevel::empty();

    for part in s.to_lowercase().split('+') {
        match part.trim() {
            "none" => {}
            "flow" => level |= disk_log::DiskLogLevel::FLOW,
            "state" => level |= disk_log::DiskLogLevel::STATE,
            "decide" => level |= disk_log::DiskLogLevel::DECIDE,
            "nibble" => level |= disk_log::DiskLogLevel::NIBBLE,
            "all" => {
                level = disk_log::DiskLogLevel::FLOW
                    | disk_log::DiskLogLevel::STATE
                    | disk_log::DiskLogLevel::DECIDE
                    | disk_log::DiskLogLevel::NIBBLE
            }
            _ => {}
        }
    }

    level
}

/// 拡張子からイメージ形式を選んで読み込む
fn load_image(path: &str) -> Result<FloppyDisk, Box<dyn Error>> {
    let data = fs::read(path)?;
    let name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let lower = path.to_lowercase();
    let disk = if lower.ends_with(".po") {
        NibbleDisk::from_po_bytes(&name, &data, false)?
    } else if lower.ends_with(".nib") {
        NibbleDisk::from_nib_bytes(&name, &data, false)?
    } else if lower.ends_with(".dsk") || lower.ends_with(".do") {
        NibbleDisk::from_dsk_bytes(&name, &data, false)?
    } else {
        return Err(format!("unsupported image extension: {}", path).into());
    };
    Ok(FloppyDisk::Nibble(disk))
}

/// ソフトスイッチ経由でヘッドを目的トラックへ進める
fn step_to_track(card: &mut Disk2InterfaceCard, track: usize, cycles: &mut u64) {
    let mut phase = 0u8;
    for _ in 0..track * 2 {
        phase = (phase + 1) & 3;
        card.io_read(0x80 | (phase << 1) | 1, *cycles);
        *cycles += 50;
        card.io_read(0x80 | (phase << 1), *cycles);
        *cycles += 50;
    }
}

fn dump_hex(data: &[u8]) {
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

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    disk_log::set_log_level(parse_disk_log_level(&args.disk_log));

    let disk = load_image(&args.image)?;
    let mut card = Disk2InterfaceCard::new(SectorMode::Sector16);
    card.insert_disk(0, disk)?;

    let mut cycles: u64 = 0;
    card.io_read(LOC_DRIVE_ON, cycles);
    step_to_track(&mut card, args.track, &mut cycles);

    if let Some(sector) = args.sector {
        let data = card.read_sector(0, args.track, sector)?;
        println!("track {} sector {}:", args.track, sector);
        dump_hex(&data);
    } else {
        let mut nibbles = Vec::with_capacity(args.count);
        let mut attempts = 0usize;
        while nibbles.len() < args.count && attempts < args.count * 2 + 6656 * 2 {
            cycles += 32;
            attempts += 1;
            let nibble = card.io_read(LOC_Q6_LOW, cycles);
            // 待ちニブルは読み飛ばす
            if nibble != 0 {
                nibbles.push(nibble);
            }
        }
        println!("track {} ({} nibbles):", args.track, nibbles.len());
        dump_hex(&nibbles);
    }

    if let Some(path) = &args.export {
        fs::write(path, card.export_dsk(0)?)?;
        println!("exported: {}", path);
    }

    if let Some(path) = &args.state_dump {
        fs::write(path, serde_json::to_string_pretty(&card.get_state())?)?;
        println!("state dumped: {}", path);
    }

    Ok(())
}
