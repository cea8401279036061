//! Blob - 名前付きのバイト列
//!
//! Blob 名はアップロードしたクライアントがそのまま指定したものです（sanitize しない）。
//! 派生 Blob の名前は元の名前の拡張子の直前に固定サフィックスを挿入して決まります。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 派生 Blob に挿入されるデフォルトのサフィックス
pub const DEFAULT_DERIVED_SUFFIX: &str = "_depolarized";

/// Metadata of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub name: String,
    pub len: u64,
    pub created_at: DateTime<Utc>,
}

/// `name` を (stem, extension) に分割する。extension は先頭の `.` を含む。
///
/// # ルール
/// - 最後の `/` より後ろ（basename）だけを見る
/// - basename の先頭に連続する `.` は拡張子の区切りとみなさない（`.bashrc` は拡張子なし）
/// - 複数の `.` がある場合は最後のものだけ（`a.tar.gz` → `a.tar` + `.gz`）
pub fn split_extension(name: &str) -> (&str, &str) {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    let Some(dot) = name.rfind('.') else {
        return (name, "");
    };
    if dot < base_start || name[base_start..dot].bytes().all(|b| b == b'.') {
        return (name, "");
    }
    name.split_at(dot)
}

/// 派生 Blob 名を計算する。
///
/// 決定的な写像なので、同じ元名を同時に処理する 2 つのセッションは同じ派生名に書き込む
/// （last-writer-wins、ロックなし）。
pub fn derived_name(source: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(source);
    format!("{stem}{suffix}{ext}")
}

/// 名前がアップロードディレクトリの外を指しうるかどうか。
///
/// 判定するだけで拒否はしない。呼び出し側がログに警告を残すために使う。
pub fn escapes_root(name: &str) -> bool {
    name.starts_with('/') || name.split(['/', '\\']).any(|part| part == "..")
}
