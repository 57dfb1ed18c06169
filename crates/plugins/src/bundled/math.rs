//! `math` plugin: `role:math,cmd:sum` and `role:math,cmd:product`.
//!
//! With a `logfile` option, every answer is also appended to that file.

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    pinion_common::{Message, message::number_value},
    pinion_dispatch::Dispatcher,
    serde::Deserialize,
    serde_json::Value,
    tracing::warn,
};

use crate::{
    error::{Context, Error},
    host::Plugin,
    log_sink::LogSink,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MathOptions {
    pub logfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Sum,
    Product,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Sum => '+',
            Self::Product => '*',
        }
    }

    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Sum => left + right,
            Self::Product => left * right,
        }
    }
}

pub struct MathPlugin;

#[async_trait]
impl Plugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    async fn init(&self, dispatcher: &Dispatcher, options: &Value) -> anyhow::Result<()> {
        let options: MathOptions = serde_json::from_value(options.clone())
            .map_err(|e| Error::invalid_options("math", e.to_string()))?;

        let log = match &options.logfile {
            Some(path) => {
                let sink = LogSink::open(path)
                    .await
                    .with_context(|| format!("cannot open logfile {}", path.display()))?;
                Some(Arc::new(sink))
            },
            None => None,
        };

        for op in [Op::Sum, Op::Product] {
            let log = log.clone();
            dispatcher.add(&format!("role:math,cmd:{}", op.name()), move |msg, _ctx| {
                let log = log.clone();
                async move { Ok(calculate(op, &msg, log.as_deref()).await) }
            })?;
        }
        Ok(())
    }
}

pub(crate) fn operand(msg: &Message, key: &str) -> f64 {
    msg.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

async fn calculate(op: Op, msg: &Message, log: Option<&LogSink>) -> Message {
    let answer = number_value(op.apply(operand(msg, "left"), operand(msg, "right")));
    if let Some(log) = log {
        let entry = format!(
            "{} {}{}{}={answer}",
            op.name(),
            render(msg.get("left")),
            op.symbol(),
            render(msg.get("right")),
        );
        if let Err(e) = log.write(&entry).await {
            warn!(path = %log.path().display(), error = %e, "math: failed to write log entry");
        }
    }
    let mut out = Message::new();
    out.insert("answer".into(), answer);
    out
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "undefined".into(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {pinion_dispatch::ErrorKind, rstest::rstest, serde_json::json};

    use {super::*, crate::host::PluginHost};

    fn msg(v: Value) -> Message {
        v.as_object().cloned().unwrap()
    }

    async fn host(options: Value) -> PluginHost {
        let mut host = PluginHost::new(Dispatcher::new());
        host.use_plugin(&MathPlugin, &options).await.unwrap();
        host
    }

    #[rstest]
    #[case("sum", json!(1), json!(2), json!(3))]
    #[case("sum", json!(1.5), json!(2.5), json!(4))]
    #[case("product", json!(3), json!(4), json!(12))]
    #[case("product", json!(0.5), json!(3), json!(1.5))]
    #[tokio::test]
    async fn answers(#[case] cmd: &str, #[case] left: Value, #[case] right: Value, #[case] expected: Value) {
        let host = host(json!({})).await;
        let out = host
            .dispatcher()
            .send(msg(json!({"role": "math", "cmd": cmd, "left": left, "right": right})))
            .await
            .unwrap();
        assert_eq!(Value::Object(out), json!({"answer": expected}));
    }

    #[tokio::test]
    async fn missing_operand_gives_null_answer() {
        let host = host(json!({})).await;
        let out = host
            .dispatcher()
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1})))
            .await
            .unwrap();
        assert_eq!(out["answer"], Value::Null);
    }

    #[tokio::test]
    async fn writes_logfile() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("math.log");
        let host = host(json!({"logfile": path})).await;
        let dispatcher = host.dispatcher();
        dispatcher
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1, "right": 2})))
            .await
            .unwrap();
        dispatcher
            .send(msg(json!({"role": "math", "cmd": "product", "left": 3, "right": 4})))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" sum 1+2=3"), "{}", lines[0]);
        assert!(lines[1].ends_with(" product 3*4=12"), "{}", lines[1]);
    }

    #[tokio::test]
    async fn unopenable_logfile_fails_startup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut host = PluginHost::new(Dispatcher::new());
        let err = host
            .use_plugin(&MathPlugin, &json!({"logfile": tmp.path()}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.to_string().contains("cannot open logfile"), "{err}");
        assert!(host.dispatcher().patterns().is_empty());
    }

    #[tokio::test]
    async fn unknown_option_fails_startup() {
        let mut host = PluginHost::new(Dispatcher::new());
        let err = host
            .use_plugin(&MathPlugin, &json!({"logfle": "x.log"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.to_string().contains("invalid options for plugin math"), "{err}");
    }
}
