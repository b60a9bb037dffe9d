//! 流桥接管道
//!
//! 把阻塞的 Agent 调用桥接为异步的 SSE 帧流：
//!
//! ```text
//! Agent 运行时 ──(同步回调)──> 事件解析 ──> 帧生成器 ──> 编码
//!                                                        │
//!                                               有界队列（背压）
//!                                                        │
//! HTTP 传输 <──(异步轮询)── 编排器 <──────────────────────┘
//! ```
//!
//! - 每个在途会话一个 `spawn_blocking` 工作线程，Agent 调用在其整个
//!   生命周期内阻塞该线程
//! - 队列有界，队列满时生产者阻塞（生产者独占线程，可以停顿）
//! - 编排器以短超时轮询出队，超时后检查工作线程是否结束，结束后做
//!   最后一次非阻塞清空
//! - 输出顺序 == 入队顺序 == 生成器产出顺序 == 回调到达顺序
//! - 上游调用失败被转换为 `error` 帧加完整终止序列，客户端永远看到
//!   格式完好的流结尾
//!
//! 取消语义的已知缺口：客户端断开只会停止消费。没有任何机制通知
//! 运行时停止，工作线程会运行到结束，其输出被丢弃。真正的取消需要
//! 上游运行时接受并检查取消令牌，这不在本层解决。

use crate::agent::events::AgentEvent;
use crate::agent::runtime::AgentRuntime;
use crate::agent::types::AgentInvocation;
use crate::stream::frames::{self, UiFrame, PING_FRAME};
use crate::stream::generators::UiMessageGenerator;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 桥接配置
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 帧队列容量（队列满时生产者阻塞）
    pub queue_capacity: usize,
    /// 出队轮询超时
    pub poll_interval: Duration,
    /// 心跳间隔（None 表示不发送心跳）
    pub heartbeat_interval: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            poll_interval: Duration::from_millis(100),
            heartbeat_interval: None,
        }
    }
}

/// 一次流式会话的最终结果
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// 累积的可见文本
    pub content: String,
    /// 上游错误（如有）
    pub error: Option<String>,
}

/// 会话结束回调
pub type FinishHook = Box<dyn FnOnce(StreamOutcome) + Send + 'static>;

/// 工作线程侧的事件接收器
///
/// 在工作线程内驱动 边界解析 → 帧生成 → 编码 → 入队 的完整链路。
/// 所有帧都在这一侧产出，顺序天然与回调到达顺序一致。
struct EventSink {
    generator: UiMessageGenerator,
    tx: mpsc::Sender<Bytes>,
    /// 接收端是否已关闭（客户端断开）
    disconnected: bool,
}

impl EventSink {
    fn new(generator: UiMessageGenerator, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            generator,
            tx,
            disconnected: false,
        }
    }

    /// 处理一个松散类型的回调负载
    fn handle(&mut self, value: Value) {
        let Some(event) = AgentEvent::from_value(&value) else {
            // 未识别的事件形状直接忽略
            return;
        };
        let frames = self.generator.process_event(&event);
        self.send_frames(frames);
    }

    /// 正常收尾：运行时未上报完成信号时补发，保证终止序列总被发送
    fn complete(&mut self) {
        if !self.generator.is_finished() {
            let frames = self.generator.process_event(&AgentEvent::Complete);
            self.send_frames(frames);
        }
    }

    /// 错误收尾：error 帧 + 强制关闭 + 终止序列
    fn abort(&mut self, message: &str) {
        let frames = self.generator.fail(message);
        self.send_frames(frames);
    }

    fn send_frames(&mut self, frames: Vec<UiFrame>) {
        for frame in frames {
            let encoded = match frames::encode(&frame) {
                Ok(sse) => sse,
                Err(e) => {
                    // 单帧序列化失败不终止整个流
                    tracing::error!("帧序列化失败，已丢弃: {e}");
                    continue;
                }
            };
            if self.disconnected {
                continue;
            }
            // 队列满时在此阻塞，对生产者施加背压
            if self.tx.blocking_send(Bytes::from(encoded)).is_err() {
                // 客户端断开。无法通知运行时停止，让它跑完并丢弃输出
                self.disconnected = true;
                tracing::warn!("流接收端已关闭，后续帧将被丢弃");
            }
        }
    }
}

/// 创建一次会话的 UIMessageStream 帧流
///
/// 在专属工作线程上执行阻塞的 Agent 调用，异步侧按序产出编码后的
/// SSE 帧，流总是以 `data: [DONE]\n\n` 结束（除非客户端提前断开）。
/// `on_finish` 在工作线程收尾时调用，用于把累积文本写回会话记录。
pub fn create_ui_message_stream(
    runtime: Arc<dyn AgentRuntime>,
    invocation: AgentInvocation,
    config: BridgeConfig,
    on_finish: Option<FinishHook>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        let (tx, mut rx) = mpsc::channel::<Bytes>(config.queue_capacity.max(1));
        let session_id = invocation.session_id.clone();

        let worker = tokio::task::spawn_blocking(move || {
            let mut sink = EventSink::new(UiMessageGenerator::new(), tx);
            let result = runtime.run(&invocation, &mut |value| sink.handle(value));

            let error = match result {
                Ok(()) => {
                    sink.complete();
                    None
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %invocation.session_id,
                        "Agent 调用失败: {e}"
                    );
                    let message = e.to_string();
                    sink.abort(&message);
                    Some(message)
                }
            };

            if let Some(hook) = on_finish {
                hook(StreamOutcome {
                    content: sink.generator.total_content().to_string(),
                    error,
                });
            }
        });

        let mut last_yield = Instant::now();
        loop {
            match tokio::time::timeout(config.poll_interval, rx.recv()).await {
                // 出队成功，立即移交传输层
                Ok(Some(frame)) => {
                    last_yield = Instant::now();
                    yield Ok(frame);
                }
                // 发送端关闭且队列已空
                Ok(None) => break,
                // 轮询超时：检查工作线程，必要时发心跳
                Err(_) => {
                    if worker.is_finished() {
                        // 最后一次非阻塞清空
                        while let Ok(frame) = rx.try_recv() {
                            yield Ok(frame);
                        }
                        break;
                    }
                    if let Some(interval) = config.heartbeat_interval {
                        if last_yield.elapsed() >= interval {
                            last_yield = Instant::now();
                            yield Ok(Bytes::from_static(PING_FRAME.as_bytes()));
                        }
                    }
                }
            }
        }

        if let Err(join_error) = worker.await {
            tracing::error!(session_id = %session_id, "Agent 工作线程异常退出: {join_error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::{AgentError, ScriptedRuntime};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Mutex;

    async fn collect_sse(runtime: Arc<dyn AgentRuntime>, config: BridgeConfig) -> String {
        let invocation = AgentInvocation {
            session_id: "s-test".to_string(),
            prompt: "hi".to_string(),
        };
        let stream = create_ui_message_stream(runtime, invocation, config, None);
        futures::pin_mut!(stream);
        let mut out = String::new();
        while let Some(Ok(bytes)) = stream.next().await {
            out.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        out
    }

    /// 提取指定类型帧的某个字符串字段，按出现顺序
    fn extract_fields(sse: &str, frame_type: &str, field: &str) -> Vec<String> {
        sse.split("\n\n")
            .filter_map(|chunk| chunk.strip_prefix("data: "))
            .filter(|data| *data != "[DONE]")
            .filter_map(|data| serde_json::from_str::<Value>(data).ok())
            .filter(|json| json.get("type").and_then(Value::as_str) == Some(frame_type))
            .filter_map(|json| {
                json.get(field)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stream_happy_path() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![
            json!({"init_event_loop": true}),
            json!({"data": "Hi"}),
            json!({"data": " there"}),
            json!({"complete": true}),
        ]));
        let sse = collect_sse(runtime, BridgeConfig::default()).await;

        for expected in [
            "\"type\":\"start\"",
            "\"type\":\"start-step\"",
            "\"type\":\"text-start\"",
            "\"type\":\"text-delta\"",
            "\"type\":\"text-end\"",
            "\"type\":\"finish-step\"",
            "\"type\":\"finish\"",
        ] {
            assert!(sse.contains(expected), "缺少 {expected}: {sse}");
        }
        assert!(sse.ends_with("data: [DONE]\n\n"));
        assert_eq!(extract_fields(&sse, "text-delta", "delta"), vec!["Hi", " there"]);
    }

    #[tokio::test]
    async fn test_stream_preserves_order() {
        let events: Vec<Value> = (0..50).map(|i| json!({ "data": format!("chunk-{i} ") })).collect();
        let runtime = Arc::new(ScriptedRuntime::new(events));
        let sse = collect_sse(runtime, BridgeConfig::default()).await;

        let deltas = extract_fields(&sse, "text-delta", "delta");
        let expected: Vec<String> = (0..50).map(|i| format!("chunk-{i} ")).collect();
        assert_eq!(deltas, expected);
    }

    #[tokio::test]
    async fn test_stream_error_tail() {
        let runtime = Arc::new(ScriptedRuntime::failing(
            vec![json!({"data": "partial"})],
            "backend exploded",
        ));
        let sse = collect_sse(runtime, BridgeConfig::default()).await;

        // 已流出的内容保留
        assert!(sse.contains("\"delta\":\"partial\""));
        // error 帧在关闭帧之前
        let error_pos = sse.find("\"type\":\"error\"").unwrap();
        let text_end_pos = sse.find("\"type\":\"text-end\"").unwrap();
        assert!(error_pos < text_end_pos);
        assert!(sse.contains("\"errorText\":\"Agent 调用失败: backend exploded\""));
        assert!(sse.contains("\"finishReason\":\"error\""));
        // 即使出错也以 [DONE] 干净收尾
        assert!(sse.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_stream_terminates_without_completion_event() {
        // 运行时忘记上报 complete/result
        let runtime = Arc::new(ScriptedRuntime::new(vec![json!({"data": "only"})]));
        let sse = collect_sse(runtime, BridgeConfig::default()).await;

        assert!(sse.contains("\"type\":\"finish\""));
        assert!(sse.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_backpressure_with_tiny_queue() {
        // 容量为 1 的队列：生产者反复阻塞，所有帧仍按序到达
        let events: Vec<Value> = (0..100).map(|i| json!({ "data": format!("{i},") })).collect();
        let runtime = Arc::new(ScriptedRuntime::new(events));
        let config = BridgeConfig {
            queue_capacity: 1,
            ..Default::default()
        };
        let sse = collect_sse(runtime, config).await;

        let deltas = extract_fields(&sse, "text-delta", "delta");
        assert_eq!(deltas.len(), 100);
        assert_eq!(deltas[0], "0,");
        assert_eq!(deltas[99], "99,");
    }

    #[tokio::test]
    async fn test_finish_hook_receives_content() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![
            json!({"data": "Hello"}),
            json!({"complete": true}),
        ]));
        let captured: Arc<Mutex<Option<StreamOutcome>>> = Arc::new(Mutex::new(None));
        let captured_clone = captured.clone();

        let invocation = AgentInvocation {
            session_id: "s-hook".to_string(),
            prompt: "hi".to_string(),
        };
        let stream = create_ui_message_stream(
            runtime,
            invocation,
            BridgeConfig::default(),
            Some(Box::new(move |outcome| {
                *captured_clone.lock().unwrap() = Some(outcome);
            })),
        );
        futures::pin_mut!(stream);
        while stream.next().await.is_some() {}

        let outcome = captured.lock().unwrap().take().unwrap();
        assert_eq!(outcome.content, "Hello");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_between_frames() {
        /// 先停顿再输出的运行时
        struct SlowRuntime;
        impl AgentRuntime for SlowRuntime {
            fn run(
                &self,
                _invocation: &AgentInvocation,
                emit: &mut dyn FnMut(Value),
            ) -> Result<(), AgentError> {
                std::thread::sleep(Duration::from_millis(250));
                emit(json!({"data": "late"}));
                emit(json!({"complete": true}));
                Ok(())
            }
        }

        let config = BridgeConfig {
            queue_capacity: 16,
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Some(Duration::from_millis(50)),
        };
        let sse = collect_sse(Arc::new(SlowRuntime), config).await;

        assert!(sse.contains(": ping\n\n"));
        assert!(sse.contains("\"delta\":\"late\""));
        assert!(sse.ends_with("data: [DONE]\n\n"));
    }
}
