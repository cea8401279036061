//! ComplementTransform - 全バイトのビット反転
//!
//! `output[i] = 255 - input[i]`。自己逆写像なので 2 回適用すると元に戻る。

use crate::ports::Transform;

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplementTransform;

impl Transform for ComplementTransform {
    fn name(&self) -> &str {
        "bitwise_complement"
    }

    fn apply(&self, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|b| !b).collect()
    }
}
