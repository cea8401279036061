//! Transform port - バイト列を派生バイト列に写す名前付きステージ

/// Transform は純粋関数として設計されます（副作用なし）。
///
/// # 契約
/// - total: どんな入力でも失敗しない
/// - 出力長 == 入力長
pub trait Transform: Send + Sync {
    /// ログ用のステージ名
    fn name(&self) -> &str;

    fn apply(&self, bytes: &[u8]) -> Vec<u8>;
}
