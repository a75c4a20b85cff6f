//! Disk2RS - Apple Disk II サブシステムエミュレーション
//!
//! Disk IIインターフェースカードとドライブ本体をハードウェアレベルで再現する:
//! - ソフトスイッチデコード ($C0E0-$C0EF 相当、オフセット $80-$8F)
//! - ステッパーモーターによるヘッド移動（クォータートラック単位）
//! - ニブル単位ドライバ (DSK/PO/NIB) とLSSビットストリームドライバ (WOZ)
//! - モーターOFFの機械的スピンダウン遅延
//!
//! CPU・ビデオ・ファイルフォーマットのパースは外部コラボレータ。
//! CPUは単調増加するサイクルカウンタを各アクセスに渡すだけでよい。

pub mod controller;
pub mod disk;
pub mod disk_log;
pub mod drive;
pub mod driver;
pub mod gcr;
pub mod nibble;
pub mod rom;
pub mod savestate;
pub mod woz;
