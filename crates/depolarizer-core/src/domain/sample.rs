//! Sample - 進捗イベントに載せる先頭バイトの抜粋

use std::fmt::Write;

/// 抜粋するバイト数
pub const SAMPLE_LEN: usize = 5;

/// 先頭 `SAMPLE_LEN` バイトを 8 桁ずつの 2 進文字列にする。
///
/// 入力が短ければ、あるバイト数だけを描画する（0 バイトなら空文字列）。
pub fn leading_bits(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(SAMPLE_LEN)];
    let mut out = String::with_capacity(head.len() * 8);
    for b in head {
        let _ = write!(out, "{b:08b}");
    }
    out
}

/// 先頭 `SAMPLE_LEN` バイトの 16 進表現（アップロード応答用）。
pub fn leading_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(SAMPLE_LEN)])
}
