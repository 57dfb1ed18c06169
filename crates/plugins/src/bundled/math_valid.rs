//! `math-valid` plugin: re-registers `role:math,cmd:sum` to reject
//! non-numeric operands before calling the sum it replaced.

use {
    async_trait::async_trait,
    pinion_dispatch::{ActError, Dispatcher},
    serde_json::{Value, json},
};

use crate::host::Plugin;

pub struct MathValidPlugin;

#[async_trait]
impl Plugin for MathValidPlugin {
    fn name(&self) -> &str {
        "math-valid"
    }

    async fn init(&self, dispatcher: &Dispatcher, _options: &Value) -> anyhow::Result<()> {
        dispatcher.add("role:math,cmd:sum", |msg, ctx| async move {
            for key in ["left", "right"] {
                match msg.get(key) {
                    Some(v) if v.is_number() => {},
                    other => {
                        return Err(ActError::handler_with_details(
                            format!("expected numbers: {key} is not a number"),
                            json!({ "field": key, "value": other }),
                        ));
                    },
                }
            }
            let info = format!("{}+{}", msg["left"], msg["right"]);
            let mut out = ctx.prior(msg).await?;
            out.insert("info".into(), Value::String(info));
            Ok(out)
        })?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        pinion_common::Message,
        pinion_dispatch::ErrorKind,
        rstest::rstest,
    };

    use {
        super::*,
        crate::{bundled::math::MathPlugin, host::PluginHost},
    };

    fn msg(v: Value) -> Message {
        v.as_object().cloned().unwrap()
    }

    async fn host() -> PluginHost {
        let mut host = PluginHost::new(Dispatcher::new());
        host.use_plugin(&MathPlugin, &json!({})).await.unwrap();
        host.use_plugin(&MathValidPlugin, &json!({})).await.unwrap();
        host
    }

    #[tokio::test]
    async fn valid_input_gets_answer_and_info() {
        let host = host().await;
        let out = host
            .dispatcher()
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1, "right": 2})))
            .await
            .unwrap();
        assert_eq!(Value::Object(out), json!({"answer": 3, "info": "1+2"}));
    }

    #[rstest]
    #[case(json!({"role": "math", "cmd": "sum", "left": "a", "right": 2}), "left")]
    #[case(json!({"role": "math", "cmd": "sum", "left": 1, "right": null}), "right")]
    #[case(json!({"role": "math", "cmd": "sum", "left": 1}), "right")]
    #[tokio::test]
    async fn invalid_input_is_handler_error(#[case] input: Value, #[case] field: &str) {
        let host = host().await;
        let err = host.dispatcher().send(msg(input)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Handler);
        let ActError::Handler { details, .. } = err else {
            panic!("expected handler error");
        };
        assert_eq!(details.unwrap()["field"], field);
    }

    #[tokio::test]
    async fn product_is_untouched() {
        let host = host().await;
        let out = host
            .dispatcher()
            .send(msg(json!({"role": "math", "cmd": "product", "left": "a", "right": 2})))
            .await
            .unwrap();
        assert_eq!(out["answer"], Value::Null);
    }
}
