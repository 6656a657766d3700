//! Application menu model.
//!
//! Items are registered once and addressed afterwards by the handle issued at
//! registration or by the session command they trigger. The presentation layer
//! re-reads `enabled`/`visible` whenever it draws.

use std::collections::HashMap;
use std::fmt;

/// Commands that only make sense once a session is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCommand {
    Open,
    OpenFolder,
    Info,
    Save,
    Export,
}

pub const SESSION_COMMANDS: [MenuCommand; 5] = [
    MenuCommand::Open,
    MenuCommand::OpenFolder,
    MenuCommand::Info,
    MenuCommand::Save,
    MenuCommand::Export,
];

impl MenuCommand {
    pub fn label(self) -> &'static str {
        match self {
            MenuCommand::Open => "Open In Browser",
            MenuCommand::OpenFolder => "Open In File Manager",
            MenuCommand::Info => "Info",
            MenuCommand::Save => "Save",
            MenuCommand::Export => "Export",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "open" => Some(MenuCommand::Open),
            "folder" => Some(MenuCommand::OpenFolder),
            "info" => Some(MenuCommand::Info),
            "save" => Some(MenuCommand::Save),
            "export" => Some(MenuCommand::Export),
            _ => None,
        }
    }
}

impl fmt::Display for MenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuItemId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub top: String,
    pub label: String,
    pub command: Option<MenuCommand>,
    pub enabled: bool,
    pub visible: bool,
}

/// A single property write on a menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuProperty {
    Enabled(bool),
    Visible(bool),
    Label(String),
}

impl MenuItem {
    fn apply(&mut self, property: MenuProperty) {
        match property {
            MenuProperty::Enabled(enabled) => self.enabled = enabled,
            MenuProperty::Visible(visible) => self.visible = visible,
            MenuProperty::Label(label) => self.label = label,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
    by_command: HashMap<MenuCommand, MenuItemId>,
}

pub const FILE_MENU: &str = "File";

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    /// The File menu with every session command registered and disabled.
    pub fn with_session_commands() -> Self {
        let mut menu = Self::new();
        menu.add_item(FILE_MENU, "New Environment", None, true);
        for command in SESSION_COMMANDS {
            menu.add_item(FILE_MENU, command.label(), Some(command), false);
        }
        menu
    }

    pub fn add_item(
        &mut self,
        top: &str,
        label: &str,
        command: Option<MenuCommand>,
        enabled: bool,
    ) -> MenuItemId {
        let id = MenuItemId(self.items.len());
        self.items.push(MenuItem {
            id,
            top: top.to_string(),
            label: label.to_string(),
            command,
            enabled,
            visible: true,
        });
        if let Some(command) = command {
            self.by_command.insert(command, id);
        }
        id
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn item(&self, id: MenuItemId) -> Option<&MenuItem> {
        self.items.get(id.0)
    }

    pub fn item_for(&self, command: MenuCommand) -> Option<&MenuItem> {
        self.by_command.get(&command).and_then(|id| self.item(*id))
    }

    pub fn is_enabled(&self, command: MenuCommand) -> bool {
        self.item_for(command).is_some_and(|item| item.enabled)
    }

    /// Returns false when no item is registered for `command`.
    pub fn set_enabled(&mut self, command: MenuCommand, enabled: bool) -> bool {
        let Some(id) = self.by_command.get(&command).copied() else {
            return false;
        };
        self.set(id, MenuProperty::Enabled(enabled))
    }

    pub fn set(&mut self, id: MenuItemId, property: MenuProperty) -> bool {
        match self.items.get_mut(id.0) {
            Some(item) => {
                item.apply(property);
                true
            }
            None => false,
        }
    }

    /// Writes `property` on every item found under `top` > `sub`; returns how many matched.
    pub fn update_submenu_item(&mut self, top: &str, sub: &str, property: MenuProperty) -> usize {
        let mut updated = 0;
        for item in self
            .items
            .iter_mut()
            .filter(|item| item.top == top && item.label == sub)
        {
            item.apply(property.clone());
            updated += 1;
        }
        updated
    }
}
