//! Tests for the JSON marshaller and its bindings.

use super::*;
use crate::event::interfaces::{
    ExceptionInterface, HttpInterface, MessageInterface, StackTraceInterface,
};
use crate::event::{EventBuilder, EventInterface, HostnameCache};
use crate::exception_schema::{CapturedException, ExceptionChain, StackFrame};
use crate::frame_filter::FrameFilter;
use crate::level::Level;

use std::any::Any;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::DateTime;
use flate2::read::ZlibDecoder;
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

#[fixture]
fn builder() -> EventBuilder {
    let cache = Arc::new(HostnameCache::with_resolver(
        || Some("marshal-host".to_owned()),
        Duration::from_secs(60),
        Duration::from_secs(5),
    ));
    EventBuilder::new().with_hostname_cache(cache)
}

fn uncompressed() -> JsonMarshaller {
    let mut marshaller = JsonMarshaller::with_default_bindings(StackTraceBinding::default());
    marshaller.set_compression(false);
    marshaller
}

fn to_json(marshaller: &JsonMarshaller, event: &Event) -> Value {
    let bytes = marshaller.to_vec(event).expect("marshall");
    serde_json::from_slice(&bytes).expect("valid JSON")
}

#[test]
fn writes_every_top_level_field() {
    let id = Uuid::parse_str("6e65f60d-9f22-495a-9556-7a61eeea2a14").expect("uuid");
    let mut builder = EventBuilder::with_id(id).expect("id");
    builder
        .set_server_name("marshal-host")
        .set_message("boom")
        .set_timestamp(DateTime::from_timestamp(1_000_000_000, 0).expect("ts"))
        .set_level(Level::Fatal)
        .set_logger("app::main")
        .set_culprit("app::main.run")
        .add_tag("env", "prod")
        .add_extra("count", 2)
        .set_checksum("ABCDEF01");
    let event = builder.build().expect("build");

    let value = to_json(&uncompressed(), &event);
    assert_eq!(
        value,
        json!({
            "event_id": "6e65f60d9f22495a95567a61eeea2a14",
            "message": "boom",
            "timestamp": "2001-09-09T01:46:40",
            "level": "fatal",
            "logger": "app::main",
            "platform": "rust",
            "culprit": "app::main.run",
            "tags": {"env": "prod"},
            "server_name": "marshal-host",
            "modules": {},
            "extra": {"count": 2},
            "checksum": "ABCDEF01",
        })
    );
}

#[rstest]
fn writes_message_interface_with_null_params(mut builder: EventBuilder) {
    let event = builder
        .add_interface(MessageInterface::new(
            "{} of {}",
            vec![Some("3".into()), None],
        ))
        .build()
        .expect("build");

    let value = to_json(&uncompressed(), &event);
    assert_eq!(
        value[MESSAGE_INTERFACE],
        json!({"message": "{} of {}", "params": ["3", null]})
    );
}

#[rstest]
fn writes_single_stack_frame(mut builder: EventBuilder) {
    let frame = StackFrame::new("31b26f01", "0cce55c9").with_lineno(1);
    let event = builder
        .add_interface(StackTraceInterface::new(vec![frame]))
        .build()
        .expect("build");

    let value = to_json(&uncompressed(), &event);
    assert_eq!(
        value[STACKTRACE_INTERFACE],
        json!({"frames": [
            {"module": "31b26f01", "function": "0cce55c9", "lineno": 1, "in_app": true}
        ]})
    );
}

fn child_and_parent() -> (Vec<StackFrame>, Vec<StackFrame>) {
    let common = StackFrame::new("", "").with_lineno(0);
    let child = vec![StackFrame::new("", "").with_lineno(1), common.clone()];
    let parent = vec![common.clone(), common];
    (child, parent)
}

#[rstest]
#[case(true, [false, true])]
#[case(false, [true, true])]
fn frames_common_with_enclosing(
    mut builder: EventBuilder,
    #[case] remove_common: bool,
    #[case] expected_in_app: [bool; 2],
) {
    let (child, parent) = child_and_parent();
    let mut binding = StackTraceBinding::new(FrameFilter::default());
    binding.set_remove_common_frames_with_enclosing(remove_common);
    let mut marshaller = JsonMarshaller::with_default_bindings(binding);
    marshaller.set_compression(false);
    let event = builder
        .add_interface(StackTraceInterface::with_enclosing(child, &parent))
        .build()
        .expect("build");

    let value = to_json(&marshaller, &event);
    let frames = value[STACKTRACE_INTERFACE]["frames"]
        .as_array()
        .expect("frames");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["lineno"], json!(0));
    assert_eq!(frames[0]["in_app"], json!(expected_in_app[0]));
    assert_eq!(frames[1]["lineno"], json!(1));
    assert_eq!(frames[1]["in_app"], json!(expected_in_app[1]));
}

#[rstest]
fn marks_library_frames_outside_app(mut builder: EventBuilder) {
    let event = builder
        .add_interface(StackTraceInterface::new(vec![
            StackFrame::new("my_app::jobs", "run"),
            StackFrame::new("std::rt", "lang_start"),
        ]))
        .build()
        .expect("build");

    let value = to_json(&uncompressed(), &event);
    let frames = &value[STACKTRACE_INTERFACE]["frames"];
    assert_eq!(frames[0]["module"], json!("std::rt"));
    assert_eq!(frames[0]["in_app"], json!(false));
    assert_eq!(frames[1]["in_app"], json!(true));
}

#[rstest]
fn writes_exception_chain_outer_first(mut builder: EventBuilder) {
    let chain = ExceptionChain::new(
        CapturedException::new("app::errors::LoadError", "cannot load")
            .with_frames(vec![StackFrame::new("app", "load").with_location("app.rs", 7)]),
    )
    .caused_by(CapturedException::new("ParseIntError", "invalid digit"));
    let event = builder
        .add_interface(ExceptionInterface::new(chain))
        .build()
        .expect("build");

    let value = to_json(&uncompressed(), &event);
    assert_eq!(
        value[EXCEPTION_INTERFACE],
        json!([
            {
                "type": "LoadError",
                "value": "cannot load",
                "module": "app::errors",
                "stacktrace": {"frames": [
                    {"module": "app", "function": "load", "filename": "app.rs", "lineno": 7, "in_app": true}
                ]}
            },
            {
                "type": "ParseIntError",
                "value": "invalid digit",
                "stacktrace": {"frames": []}
            }
        ])
    );
}

#[rstest]
fn writes_http_interface(mut builder: EventBuilder) {
    let http = HttpInterface::new("https://example.com/login", "POST")
        .with_query_string("next=/")
        .with_header("Accept", "text/html")
        .with_header("Accept", "application/json")
        .with_cookie("session", "abc")
        .with_data("user", "ann");
    let event = builder.add_interface(http).build().expect("build");

    let value = to_json(&uncompressed(), &event);
    assert_eq!(
        value[HTTP_INTERFACE],
        json!({
            "url": "https://example.com/login",
            "method": "POST",
            "query_string": "next=/",
            "cookies": {"session": "abc"},
            "headers": {"Accept": ["text/html", "application/json"]},
            "data": {"user": ["ann"]},
            "env": {},
        })
    );
}

#[derive(Debug)]
struct CustomInterface(u32);

impl EventInterface for CustomInterface {
    fn interface_name(&self) -> &'static str {
        "custom.interfaces.Counter"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CounterBinding;

impl InterfaceBinding for CounterBinding {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError> {
        let counter = interface
            .as_any()
            .downcast_ref::<CustomInterface>()
            .ok_or(MarshallError::UnexpectedInterface("custom.interfaces.Counter"))?;
        Ok(json!({ "count": counter.0 }))
    }
}

#[rstest]
fn new_interface_kinds_need_only_a_binding(mut builder: EventBuilder) {
    let mut marshaller = uncompressed();
    marshaller.add_binding("custom.interfaces.Counter", CounterBinding);
    let event = builder
        .add_interface(CustomInterface(9))
        .build()
        .expect("build");

    let value = to_json(&marshaller, &event);
    assert_eq!(value["custom.interfaces.Counter"], json!({"count": 9}));
}

#[rstest]
fn skips_interfaces_without_binding(mut builder: EventBuilder) {
    let event = builder
        .add_interface(CustomInterface(1))
        .build()
        .expect("build");

    let value = to_json(&uncompressed(), &event);
    assert!(value.get("custom.interfaces.Counter").is_none());
    assert!(value.get("event_id").is_some());
}

#[rstest]
fn mismatched_binding_is_an_error(mut builder: EventBuilder) {
    let mut marshaller = uncompressed();
    marshaller.add_binding(MESSAGE_INTERFACE, StackTraceBinding::default());
    let event = builder
        .add_interface(MessageInterface::new("m {}", vec![None]))
        .build()
        .expect("build");

    assert!(matches!(
        marshaller.to_vec(&event),
        Err(MarshallError::UnexpectedInterface(STACKTRACE_INTERFACE))
    ));
}

#[rstest]
fn compressed_output_is_base64_zlib(mut builder: EventBuilder) {
    let event = builder.set_message("compressed").build().expect("build");
    let compressed = JsonMarshaller::with_default_bindings(StackTraceBinding::default())
        .to_vec(&event)
        .expect("marshall");

    let deflated = BASE64_STANDARD.decode(&compressed).expect("base64");
    let mut json = String::new();
    ZlibDecoder::new(deflated.as_slice())
        .read_to_string(&mut json)
        .expect("inflate");
    let value: Value = serde_json::from_str(&json).expect("JSON");
    assert_eq!(value["message"], json!("compressed"));
    assert_eq!(value, to_json(&uncompressed(), &event));
}
