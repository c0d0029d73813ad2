use crate::transport::TransportError;

/// 单条连接上突发的阶段。
///
/// # 教案式说明
/// - **意图 (Why)**：刻画“已发现 → 受控 → 突发中 → 完成/中止”的生命周期，
///   让结果值本身就能说明突发停在哪一步；
/// - **契约 (What)**：
///   - 合法跃迁：`Discovered → Ready → Bursting → {Completed, Aborted}`；
///   - `Completed` 与 `Aborted` 为终态，核心不做任何重试。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BurstPhase {
    /// 交换机已接入，握手未完成。
    Discovered,
    /// 握手完成，等待突发开始。
    Ready,
    /// 突发进行中。
    Bursting,
    /// 全部发送成功。
    Completed,
    /// 某次发送失败，突发已中止。
    Aborted,
}

impl BurstPhase {
    /// 判断阶段是否允许跃迁至 `target`。
    pub fn can_transition_to(self, target: BurstPhase) -> bool {
        matches!(
            (self, target),
            (BurstPhase::Discovered, BurstPhase::Ready)
                | (BurstPhase::Ready, BurstPhase::Bursting)
                | (BurstPhase::Bursting, BurstPhase::Completed)
                | (BurstPhase::Bursting, BurstPhase::Aborted)
        )
    }

    /// 是否为终态。
    pub fn is_terminal(self) -> bool {
        matches!(self, BurstPhase::Completed | BurstPhase::Aborted)
    }
}

/// 一次突发的结果。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - 全部成功：`sent == requested`，`failed_at` 与 `cause` 均为 `None`，`phase == Completed`；
///   - 第 `k` 次失败：`sent == k - 1`，`failed_at == Some(k)`，`cause` 为失败原因，`phase == Aborted`；
///   - 尝试序号从 1 开始。
#[derive(Debug)]
pub struct BurstResult<Id> {
    /// 目标交换机。
    pub switch: Id,
    /// 请求的发送次数。
    pub requested: u64,
    /// 成功发送的次数。
    pub sent: u64,
    /// 失败的尝试序号。
    pub failed_at: Option<u64>,
    /// 失败原因。
    pub cause: Option<TransportError>,
    /// 结束时所处的阶段。
    pub phase: BurstPhase,
}

impl<Id> BurstResult<Id> {
    /// 是否全部发送成功。
    pub fn is_completed(&self) -> bool {
        self.phase == BurstPhase::Completed
    }

    /// 是否因发送失败而中止。
    pub fn is_aborted(&self) -> bool {
        self.phase == BurstPhase::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases_accept_no_transition() {
        for from in [BurstPhase::Completed, BurstPhase::Aborted] {
            assert!(from.is_terminal());
            for to in [
                BurstPhase::Discovered,
                BurstPhase::Ready,
                BurstPhase::Bursting,
                BurstPhase::Completed,
                BurstPhase::Aborted,
            ] {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn ready_cannot_skip_bursting() {
        assert!(!BurstPhase::Ready.can_transition_to(BurstPhase::Completed));
        assert!(BurstPhase::Ready.can_transition_to(BurstPhase::Bursting));
    }
}
