//! Theme Demo
//!
//! A `theme-provider` element publishes a [`Theme`] under the `THEME` key.
//! `themed-button` elements anywhere below it pick the theme up without
//! knowing who provides it, and re-render whenever it changes.
//!
//! ```text
//! root
//! ├── theme-provider (mode=light)
//! │   ├── themed-button "Save"
//! │   └── panel
//! │       └── themed-button "Cancel"
//! └── (buttons moved here lose the theme)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package theme-demo -- --mode dark --toggles 3
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arbor::prelude::*;
use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

context_key! {
    /// The active colour theme.
    pub static THEME = ("theme-demo", "theme");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Theme {
    mode: String,
}

impl Theme {
    fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }

    fn toggled(&self) -> Self {
        match self.mode.as_str() {
            "dark" => Self::new("light"),
            _ => Self::new("dark"),
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Provides the theme to its subtree. The `mode` attribute drives the value.
struct ThemeProvider {
    slot: ProviderSlot<Theme>,
}

impl ThemeProvider {
    fn new() -> Self {
        Self {
            slot: ProviderSlot::new(THEME),
        }
    }

    /// Flips between light and dark.
    fn toggle_theme(&self) {
        if let Some(provider) = self.slot.handle() {
            provider.update_with(Theme::toggled);
        }
    }

    fn subscribers(&self) -> usize {
        self.slot.handle().map_or(0, |p| p.subscriber_count())
    }
}

impl Element for ThemeProvider {
    fn observed_attributes(&self) -> &'static [&'static str] {
        &["mode"]
    }

    fn connected(&self, node: &NodeRef) {
        let mode = node.attribute("mode").unwrap_or_else(|| "light".to_string());
        self.slot.attach(node, Theme::new(mode));
    }

    fn disconnected(&self, _node: &NodeRef) {
        self.slot.detach();
    }

    fn attribute_changed(
        &self,
        _node: &NodeRef,
        name: &str,
        _old: Option<&str>,
        new: Option<&str>,
    ) {
        if name == "mode"
            && let Some(mode) = new
        {
            self.slot.update(Theme::new(mode));
        }
    }
}

/// Renders its label in the nearest provided theme.
struct ThemedButton {
    label: String,
    slot: ConsumerSlot,
    rendered: Arc<Mutex<String>>,
}

impl ThemedButton {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            slot: ConsumerSlot::new(THEME),
            rendered: Arc::new(Mutex::new(format!("[{label}] unthemed"))),
        }
    }

    fn rendered(&self) -> String {
        self.rendered.lock().clone()
    }
}

impl Element for ThemedButton {
    fn connected(&self, node: &NodeRef) {
        let label = self.label.clone();
        let rendered = Arc::clone(&self.rendered);
        *rendered.lock() = format!("[{label}] unthemed");
        self.slot.attach(node, move |theme: &Theme| {
            *rendered.lock() = format!("[{label}] {}", theme.mode);
        });
    }

    fn disconnected(&self, _node: &NodeRef) {
        self.slot.detach();
    }
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "theme-demo", about = "Share a theme down an Arbor tree")]
struct Args {
    /// Initial theme mode.
    #[arg(long, default_value = "light")]
    mode: String,

    /// How many times to toggle the theme.
    #[arg(long, default_value_t = 2)]
    toggles: usize,

    /// Configuration file (arbor.toml / arbor.yaml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Snapshot {
    theme: Option<Theme>,
    subscribers: usize,
    buttons: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ArborRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;
    let tree = runtime.tree();

    let provider = Arc::new(ThemeProvider::new());
    let provider_id = tree.create_element("theme-provider", provider.clone());
    tree.set_attribute(provider_id, "mode", args.mode.as_str())?;
    tree.append_child(NodeId::ROOT, provider_id)?;

    let save = Arc::new(ThemedButton::new("Save"));
    let cancel = Arc::new(ThemedButton::new("Cancel"));
    runtime.mount_under(provider_id, "themed-button", save.clone())?;
    let panel = tree.create_node("panel");
    tree.append_child(provider_id, panel)?;
    let cancel_id = runtime.mount_under(panel, "themed-button", cancel.clone())?;

    let render = |stage: &str| {
        info!(stage, save = %save.rendered(), cancel = %cancel.rendered(), "Rendered");
    };
    render("mounted");

    for _ in 0..args.toggles {
        provider.toggle_theme();
        render("toggled");
    }

    tree.set_attribute(provider_id, "mode", "contrast")?;
    render("attribute");

    // Outside the provider's subtree the button finds no theme.
    tree.append_child(NodeId::ROOT, cancel_id)?;
    render("moved");

    let snapshot = Snapshot {
        theme: provider.slot.value().map(|theme| (*theme).clone()),
        subscribers: provider.subscribers(),
        buttons: vec![save.rendered(), cancel.rendered()],
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for button in &snapshot.buttons {
            println!("{button}");
        }
        println!("subscribers: {}", snapshot.subscribers);
    }

    Ok(())
}
