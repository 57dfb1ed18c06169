//! `math-integer` plugin: `role:math,cmd:sum,integer:true` floors both
//! operands and hands the message to the sum it overrides.

use {
    async_trait::async_trait,
    pinion_common::message::number_value,
    pinion_dispatch::Dispatcher,
    serde_json::Value,
};

use crate::{bundled::math::operand, host::Plugin};

pub struct MathIntegerPlugin;

#[async_trait]
impl Plugin for MathIntegerPlugin {
    fn name(&self) -> &str {
        "math-integer"
    }

    async fn init(&self, dispatcher: &Dispatcher, _options: &Value) -> anyhow::Result<()> {
        dispatcher.add("role:math,cmd:sum,integer:true", |mut msg, ctx| async move {
            for key in ["left", "right"] {
                let floored = number_value(operand(&msg, key).floor());
                msg.insert(key.into(), floored);
            }
            ctx.prior(msg).await
        })?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {pinion_common::Message, pinion_dispatch::ErrorKind, serde_json::json};

    use {
        super::*,
        crate::{bundled::math::MathPlugin, host::PluginHost},
    };

    fn msg(v: Value) -> Message {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn floors_then_delegates_to_sum() {
        let mut host = PluginHost::new(Dispatcher::new());
        host.use_plugin(&MathPlugin, &json!({})).await.unwrap();
        host.use_plugin(&MathIntegerPlugin, &json!({})).await.unwrap();
        let dispatcher = host.dispatcher();

        let out = dispatcher
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1.5, "right": 2.5, "integer": true})))
            .await
            .unwrap();
        assert_eq!(Value::Object(out), json!({"answer": 3}));

        // Without the flag the plain sum still answers.
        let out = dispatcher
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1.5, "right": 2.5})))
            .await
            .unwrap();
        assert_eq!(Value::Object(out), json!({"answer": 4}));
    }

    #[tokio::test]
    async fn without_sum_there_is_no_prior() {
        let mut host = PluginHost::new(Dispatcher::new());
        host.use_plugin(&MathIntegerPlugin, &json!({})).await.unwrap();
        let err = host
            .dispatcher()
            .send(msg(json!({"role": "math", "cmd": "sum", "left": 1, "right": 2, "integer": true})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatch);
    }
}
