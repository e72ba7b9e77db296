use brindle::{ComponentDef, ComponentError, Engine, EngineConfig, RenderError, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn card_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_template(
        "components.card",
        "<div class=\"card\"><h2>{{ title }}</h2>{{ header }}<p>{{ slot }}</p></div>",
    );
    engine
}

#[test]
fn test_props_default_and_named_slots() {
    let engine = card_engine();
    let out = engine
        .render_inline(
            "@component('card', {title: heading})Body @slot('header')<em>H</em>@endslot text@endcomponent",
            json!({"heading": "Hi"}),
        )
        .expect("Should render");

    assert_eq!(
        out,
        "<div class=\"card\"><h2>Hi</h2><em>H</em><p>Body  text</p></div>"
    );
}

#[test]
fn test_slots_render_in_component_scope() {
    let engine = card_engine();
    let out = engine
        .render_inline(
            "@component('card', {title: 'X'})by {{ title }}@endcomponent",
            json!({"title": "Caller"}),
        )
        .expect("Should render");

    assert_eq!(out, "<div class=\"card\"><h2>X</h2><p>by X</p></div>");
}

#[test]
fn test_caller_variables_stay_outside() {
    let mut engine = Engine::new();
    engine.set_data(json!({"site": "Docs"}));
    engine.register_template("components.peek", "{{ secret || 'hidden' }}/{{ site }}");

    let out = engine
        .render_inline("@component('peek')@endcomponent", json!({"secret": "s"}))
        .expect("Should render");
    assert_eq!(out, "hidden/Docs");
}

#[test]
fn test_content_fallback_when_body_is_blank() {
    let mut engine = Engine::new();
    engine.register_template("components.panel", "<section>{{ content || 'fallback' }}</section>");

    assert_eq!(
        engine
            .render_inline("@component('panel')  \n @endcomponent", json!({}))
            .expect("Should render"),
        "<section>fallback</section>"
    );
    assert_eq!(
        engine
            .render_inline("@component('panel') body @endcomponent", json!({}))
            .expect("Should render"),
        "<section> body </section>"
    );
}

#[test]
fn test_slots_object_lists_every_slot() {
    let mut engine = Engine::new();
    engine.register_component(
        "keys",
        ComponentDef::fragment("@foreach(names as n){{ slots[n] }};@endforeach"),
    );

    let out = engine
        .render_inline(
            "@component('keys', {names: ['default', 'footer']})main @slot('footer')foot@endslot@endcomponent",
            json!({}),
        )
        .expect("Should render");
    assert_eq!(out, "main ;foot;");
}

#[test]
fn test_nested_components() {
    let mut engine = Engine::new();
    engine.register_template("components.box", "<div>{{ slot }}</div>");

    let out = engine
        .render_inline(
            "@component('box')@component('box')in@endcomponent@endcomponent",
            json!({}),
        )
        .expect("Should render");
    assert_eq!(out, "<div><div>in</div></div>");
}

#[test]
fn test_adjacent_components_and_slots() {
    let engine = card_engine();
    let out = engine
        .render_inline(
            "@component('card', {title: 1})a@slot('header')h@endslot@endcomponent@component('card', {title: 2})b@endcomponent",
            json!({}),
        )
        .expect("Should render");

    assert_eq!(
        out,
        "<div class=\"card\"><h2>1</h2>h<p>a</p></div><div class=\"card\"><h2>2</h2><p>b</p></div>"
    );
}

#[test]
fn test_missing_component_placeholder() {
    let engine = Engine::new();
    let out = engine
        .render_inline("a @component('ghost')x@endcomponent b", json!({}))
        .expect("Should render");
    assert_eq!(out, "a <!-- component not found: ghost --> b");
}

#[test]
fn test_failing_component_placeholder() {
    let mut engine = Engine::new();
    engine.register_component(
        "boom",
        ComponentDef::function(|_, _| Err(ComponentError::failed("exploded"))),
    );
    engine.register_template("components.orphan", "@extends('missing.layout')");

    let out = engine
        .render_inline(
            "@component('boom')@endcomponent|@component('orphan')@endcomponent",
            json!({}),
        )
        .expect("Should render");
    assert_eq!(
        out,
        "<!-- component error: boom -->|<!-- component error: orphan -->"
    );
}

#[test]
fn test_recursive_component_fails_render() {
    let mut engine = Engine::new();
    engine.register_template("components.again", "@component('again')@endcomponent");

    let err = engine
        .render_inline("@component('again')@endcomponent", json!({}))
        .expect_err("Should fail");
    assert!(matches!(err, RenderError::RecursionLimit { .. }));
}

#[test]
fn test_registry_and_namespace_lookup_order() {
    let mut engine = Engine::new();
    engine.register_template("badge", "template badge");
    engine.register_template("components.badge", "namespaced badge");
    engine.register_template("components.chip", "namespaced chip");

    let out = engine
        .render_inline(
            "@component('badge')@endcomponent / @component('chip')@endcomponent",
            json!({}),
        )
        .expect("Should render");
    assert_eq!(out, "template badge / namespaced chip");

    engine.register_component("badge", ComponentDef::fragment("registered badge"));
    let out = engine
        .render_inline("@component('badge')@endcomponent", json!({}))
        .expect("Should render");
    assert_eq!(out, "registered badge");
}

#[test]
fn test_custom_namespace_and_loader() {
    let engine = Engine::with_config(EngineConfig::new().with_default_namespace("ui"))
        .with_loader(|name: &str| (name == "ui.icon").then(|| "<i>{{ glyph }}</i>".to_string()));

    let out = engine
        .render_inline("@component('icon', {glyph: '*'})@endcomponent", json!({}))
        .expect("Should render");
    assert_eq!(out, "<i>*</i>");
}

#[test]
fn test_adapter_rewrites_props() {
    let mut engine = Engine::new();
    engine.register_component(
        "button",
        ComponentDef::fragment("<button class=\"{{ kind }}\">{{ slot }}</button>"),
    );
    engine.register_component(
        "primary",
        ComponentDef::adapter("button", |instance| {
            let mut props = instance.props().clone();
            props.insert("kind".to_string(), Value::from("primary"));
            props
        }),
    );

    let out = engine
        .render_inline("@component('primary')Go@endcomponent", json!({}))
        .expect("Should render");
    assert_eq!(out, "<button class=\"primary\">Go</button>");
}

#[test]
fn test_function_component_renders_templates() {
    let mut engine = Engine::new();
    engine.register_template("partials.row", "<tr><td>{{ cell }}</td></tr>");
    engine.register_component(
        "table",
        ComponentDef::function(|instance, scope| {
            let mut html = String::from("<table>");
            let rows = instance
                .prop("rows")
                .and_then(Value::as_array)
                .map(<[Value]>::to_vec)
                .unwrap_or_default();
            for row in rows {
                let mut ctx = brindle::Context::default();
                ctx.insert("cell", row);
                html.push_str(&scope.render_named("partials.row", &ctx)?);
            }
            html.push_str("</table>");
            Ok(html)
        }),
    );

    let out = engine
        .render_inline("@component('table', {rows: [1, 2]})@endcomponent", json!({}))
        .expect("Should render");
    assert_eq!(out, "<table><tr><td>1</td></tr><tr><td>2</td></tr></table>");
}

#[test]
fn test_component_aliases() {
    let mut engine = Engine::with_config(EngineConfig::new().with_alias("ui", "vendor.ui"));
    engine.register_template("vendor.ui.chip", "<span>{{ slot }}</span>");

    assert_eq!(
        engine
            .render_inline("@component('ui::chip')c@endcomponent", json!({}))
            .expect("Should render"),
        "<span>c</span>"
    );
    assert_eq!(
        engine.render_inline("@component('shop::cart')@endcomponent", json!({})),
        Err(RenderError::AliasNotRegistered {
            alias: "shop".to_string()
        })
    );
}
