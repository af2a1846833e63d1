//! A `console` shim for scripts.
//!
//! Scripts have no stdout; whatever they log is forwarded to the host's
//! structured logger under the `script` target.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsResult, JsValue, NativeFunction};

/// Register a global `console` object in `context`.
pub fn register(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(console_debug), js_string!("debug"), 1)
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("log"), 1)
        .function(NativeFunction::from_fn_ptr(console_info), js_string!("info"), 1)
        .function(NativeFunction::from_fn_ptr(console_warn), js_string!("warn"), 1)
        .function(NativeFunction::from_fn_ptr(console_error), js_string!("error"), 1);
    let console = initializer.build();

    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    Ok(())
}

fn render(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    Ok(parts.join(" "))
}

fn console_debug(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = render(args, context)?;
    tracing::debug!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_log(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = render(args, context)?;
    tracing::info!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_info(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = render(args, context)?;
    tracing::info!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_warn(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = render(args, context)?;
    tracing::warn!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

fn console_error(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = render(args, context)?;
    tracing::error!(target: "script", "{line}");
    Ok(JsValue::undefined())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    #[test]
    fn test_console_is_registered() {
        let mut context = Context::default();
        register(&mut context).unwrap();

        let result = context.eval(Source::from_bytes(
            "console.log('a', 1, true); console.warn('b'); 'done'",
        ));
        assert!(result.is_ok());
    }
}
