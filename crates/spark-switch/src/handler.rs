use async_trait::async_trait;

use crate::datapath::SwitchRef;

/// 交换机生命周期回调。
///
/// # 教案式说明
/// - **意图 (Why)**：以显式 trait 取代“按方法名查找”的动态注册，控制器只认识这一个接口；
/// - **契约 (What)**：
///   - `switch_ready` 在每条连接完成握手后恰好调用一次，运行在独立任务上，
///     返回前控制器仍持续应答该连接上的 ECHO_REQUEST；
///   - 传入的 [`SwitchRef`] 只在该连接存活期间有效，连接拆除或被取代后，
///     经它发出的消息一律失败；
///   - 连接拆除时会等待 `switch_ready` 返回，再调用 `switch_disconnected`；
///   - `switch_disconnected` 在交换机从登记表移除后调用，默认实现为空；
///   - 回调不返回错误：单台交换机的失败不应影响控制器的监听循环；
/// - **风险 (Trade-offs)**：同一交换机重连时会以相同的数据通路标识、新的连接序号再次触发
///   `switch_ready`；`switch_ready` 若永不返回，连接拆除与控制器停机都会随之等待。
#[async_trait]
pub trait SwitchReadyHandler: Send + Sync + 'static {
    /// 交换机已进入受控状态。
    async fn switch_ready(&self, switch: SwitchRef);

    /// 交换机连接已拆除。
    async fn switch_disconnected(&self, switch: SwitchRef) {
        let _ = switch;
    }
}
