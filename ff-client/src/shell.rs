//! The interactive terminal front end: command parsing and screen rendering.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Context, Result};
use ff::basic_models::{Difficulty, EntityId, User};

use crate::app::App;
use crate::backend::Backend;
use crate::config::Config;
use crate::dashboard::{Dashboard, View};
use crate::form::{FormMode, RecipeForm};
use crate::prompt::Prompt;
use crate::recipes::thumbnail_or_placeholder;
use crate::session::{Connectivity, Screen};

pub const HELP: &str = "\
Landing:
  login <email> <password>          sign in
  signup <name> <email> <password>  create a chef account
  demo                              try the demo chef account
Dashboard:
  list                              show my recipes
  new                               start a new recipe
  edit <id>                         view and edit one of my recipes
  set <field> <value>               title, description, prepTime, cookTime, servings, difficulty
  photo <path> | unphoto            attach or remove the recipe photo
  search <text>                     find ingredients (2+ characters)
  pick <n> | drop <id>              add a search result / remove an ingredient
  save | delete | back              publish or save changes, delete, leave the form
  logout
Anywhere:
  show, status, admin, help, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Show,
    Admin,
    Login {
        email: String,
        password: String,
    },
    Signup {
        name: String,
        email: String,
        password: String,
    },
    Demo,
    Logout,
    List,
    New,
    Edit(EntityId),
    Back,
    Set {
        field: String,
        value: String,
    },
    Photo(PathBuf),
    Unphoto,
    Search(String),
    /// 1-based index into the search results.
    Pick(usize),
    Drop(EntityId),
    Save,
    Delete,
}

fn parse_id(arg: &str) -> Result<EntityId> {
    arg.trim_start_matches('#')
        .parse()
        .with_context(|| format!("Not a recipe or ingredient id: {arg:?}"))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();
        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = match head.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "status" => Command::Status,
            "show" => Command::Show,
            "admin" => Command::Admin,
            "login" => match args[..] {
                [email, password] => Command::Login {
                    email: email.into(),
                    password: password.into(),
                },
                _ => bail!("Usage: login <email> <password>"),
            },
            "signup" => match args[..] {
                [ref name @ .., email, password] if !name.is_empty() => Command::Signup {
                    name: name.join(" "),
                    email: email.into(),
                    password: password.into(),
                },
                _ => bail!("Usage: signup <name> <email> <password>"),
            },
            "demo" => Command::Demo,
            "logout" => Command::Logout,
            "list" => Command::List,
            "new" => Command::New,
            "edit" => match args[..] {
                [id] => Command::Edit(parse_id(id)?),
                _ => bail!("Usage: edit <id>"),
            },
            "back" | "cancel" => Command::Back,
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                ensure!(!field.is_empty(), "Usage: set <field> <value>");
                Command::Set {
                    field: field.into(),
                    value: value.trim().into(),
                }
            }
            "photo" => {
                ensure!(!rest.is_empty(), "Usage: photo <path>");
                Command::Photo(PathBuf::from(rest))
            }
            "unphoto" => Command::Unphoto,
            "search" => Command::Search(rest.into()),
            "pick" => match args[..] {
                [n] => match n.parse::<usize>() {
                    Ok(n) if n >= 1 => Command::Pick(n),
                    _ => bail!("Pick a result by its number, starting at 1"),
                },
                _ => bail!("Usage: pick <n>"),
            },
            "drop" => match args[..] {
                [id] => Command::Drop(parse_id(id)?),
                _ => bail!("Usage: drop <id>"),
            },
            "save" | "publish" => Command::Save,
            "delete" => Command::Delete,
            "" => Command::Show,
            other => bail!("Unknown command {other:?}; try `help`"),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// What a command asks to show once it has run.
enum Outcome {
    Quit,
    Text(String),
    /// The current screen, optionally under a one-line message.
    Screen(Option<String>),
}

/// Shorten a data URL so a preview fits on one line.
fn describe_preview(preview: &str) -> String {
    match preview.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => {
            format!("{header},... ({} characters)", data.len())
        }
        _ => preview.to_string(),
    }
}

/// Marker kept on every screen while the backend is unreachable.
pub const OFFLINE_MARKER: &str = "Backend: offline";

pub fn render_header(user: &User, config: &Config, connectivity: Connectivity) -> String {
    let mut out = format!("FlavorFind | {} ({})", user.name, user.role);
    if user.is_admin() {
        let _ = write!(out, " | admin panel: {}", config.admin_panel_url());
    }
    if connectivity == Connectivity::Offline {
        let _ = write!(out, " | {OFFLINE_MARKER}");
    }
    out
}

pub fn render_landing(config: &Config, connectivity: Connectivity) -> String {
    let title = if connectivity == Connectivity::Offline {
        format!("FlavorFind | {OFFLINE_MARKER}")
    } else {
        "FlavorFind".to_string()
    };
    format!(
        "{title}\n\
         Discover, create, and share delicious recipes from around the world.\n\
         \n  login <email> <password>\n  signup <name> <email> <password>\n  demo    (try the chef demo)\n\
         \nAdmin panel: {}",
        config.admin_panel_url()
    )
}

pub fn render_list<B: Backend>(dashboard: &Dashboard<B>) -> String {
    let mut out = String::from("My Recipes\n");
    if dashboard.recipes().is_loading() {
        out.push_str("  Loading recipes...");
        return out;
    }
    let recipes = dashboard.my_recipes();
    if recipes.is_empty() {
        out.push_str("  No recipes yet. Use `new` to create one.");
        return out;
    }
    for recipe in recipes {
        let chef = recipe
            .chef
            .as_ref()
            .map_or(dashboard.chef().name.as_str(), |c| c.name.as_str());
        let _ = writeln!(
            out,
            "  #{} {} [{}] {} min, {} servings, by {}\n      photo: {}",
            recipe.id,
            recipe.title,
            recipe.difficulty,
            recipe.total_time(),
            recipe.servings,
            chef,
            thumbnail_or_placeholder(recipe),
        );
    }
    out.trim_end().to_string()
}

pub fn render_form(form: &RecipeForm) -> String {
    let draft = form.draft();
    let picker = form.picker();
    let editing = matches!(form.mode(), FormMode::Edit { .. });
    let mut out = String::from(if editing {
        "Edit Recipe\n"
    } else {
        "Create a New Recipe\n"
    });
    let difficulties: Vec<String> = Difficulty::ALL
        .iter()
        .map(|d| {
            if *d == draft.difficulty {
                format!("[{d}]")
            } else {
                d.to_string()
            }
        })
        .collect();
    let ingredients: Vec<String> = picker
        .selected()
        .iter()
        .map(|i| format!("{} (#{})", i.name, i.id))
        .collect();
    let _ = writeln!(out, "  title:       {}", draft.title);
    let _ = writeln!(out, "  description: {}", draft.description);
    let _ = writeln!(
        out,
        "  prepTime: {} min  cookTime: {} min  servings: {}",
        draft.prep_time, draft.cook_time, draft.servings
    );
    let _ = writeln!(out, "  difficulty:  {}", difficulties.join(" "));
    let _ = writeln!(
        out,
        "  photo:       {}",
        draft
            .photo
            .preview()
            .map_or_else(|| "(none)".to_string(), describe_preview)
    );
    let _ = writeln!(
        out,
        "  ingredients: {}",
        if ingredients.is_empty() {
            "(none)".to_string()
        } else {
            ingredients.join(", ")
        }
    );
    if !picker.query().is_empty() {
        let _ = writeln!(out, "  search:      {:?}", picker.query());
        for (n, ingredient) in picker.results().iter().enumerate() {
            let _ = writeln!(out, "    {}. {}", n + 1, ingredient.name);
        }
    }
    out.push_str(if editing {
        "  save changes with `save`, `delete` to remove, `back` to cancel"
    } else {
        "  publish with `save`, `back` to cancel"
    });
    out
}

/// A terminal session over an [`App`].
pub struct Shell<B> {
    app: App<B>,
    config: Config,
}

impl<B: Backend> Shell<B> {
    pub fn new(backend: Arc<B>, config: Config) -> Self {
        Self {
            app: App::new(backend),
            config,
        }
    }

    pub fn app(&self) -> &App<B> {
        &self.app
    }

    /// Restore any existing session and render the first screen.
    pub async fn start(&mut self) -> String {
        self.app.start().await;
        format!("{}\n\n{}", self.status(), self.render())
    }

    pub fn status(&self) -> String {
        format!("Backend: {}", self.app.session().connectivity())
    }

    /// Short label for the input line.
    pub fn label(&self) -> String {
        match self.app.dashboard() {
            None => "flavorfind> ".to_string(),
            Some(d) => match d.view() {
                View::List => "flavorfind:list> ".to_string(),
                View::Create => "flavorfind:new> ".to_string(),
                View::Edit => "flavorfind:edit> ".to_string(),
            },
        }
    }

    pub fn render(&self) -> String {
        match (self.app.session().user(), self.app.dashboard()) {
            (Some(user), Some(dashboard)) => {
                let body = match dashboard.view() {
                    View::List => render_list(dashboard),
                    View::Create | View::Edit => render_form(dashboard.form()),
                };
                let header = render_header(user, &self.config, self.app.session().connectivity());
                format!("{header}\n\n{body}")
            }
            _ => render_landing(&self.config, self.app.session().connectivity()),
        }
    }

    fn landing(&self) -> Result<()> {
        ensure!(
            self.app.session().screen() == Screen::Landing,
            "Already signed in; `logout` first"
        );
        Ok(())
    }

    fn dashboard(&mut self) -> Result<&mut Dashboard<B>> {
        self.app
            .dashboard_mut()
            .ok_or_else(|| anyhow!("Sign in first (`login`, `signup` or `demo`)"))
    }

    fn open_form(&mut self) -> Result<&mut Dashboard<B>> {
        let dashboard = self.dashboard()?;
        ensure!(
            dashboard.form().is_open(),
            "Start a recipe with `new` or `edit <id>` first"
        );
        Ok(dashboard)
    }

    /// Run one command, then fall back to landing if the backend refused the session.
    ///
    /// The screen is rendered last, so it shows the status the command left behind.
    pub async fn execute(&mut self, command: Command, prompt: &mut impl Prompt) -> Result<Reply> {
        let outcome = self.dispatch(command, &mut *prompt).await;
        if self.app.settle(&mut *prompt).await {
            return Ok(Reply::Text(format!(
                "Signed out: your session has expired.\n\n{}",
                self.render()
            )));
        }
        let reply = match outcome? {
            Outcome::Quit => Reply::Quit,
            Outcome::Text(text) => Reply::Text(text),
            Outcome::Screen(None) => Reply::Text(self.render()),
            Outcome::Screen(Some(message)) => {
                Reply::Text(format!("{message}\n\n{}", self.render()))
            }
        };
        Ok(reply)
    }

    async fn dispatch(&mut self, command: Command, prompt: &mut impl Prompt) -> Result<Outcome> {
        let outcome = match command {
            Command::Help => Outcome::Text(HELP.to_string()),
            Command::Quit => Outcome::Quit,
            Command::Status => Outcome::Text(self.status()),
            Command::Show => Outcome::Screen(None),
            Command::Admin => {
                let allowed = self.app.session().user().map_or(true, User::is_admin);
                ensure!(allowed, "The admin panel is for admins only");
                Outcome::Text(format!("Admin panel: {}", self.config.admin_panel_url()))
            }
            Command::Login { email, password } => {
                self.landing()?;
                self.app.login(&email, &password, prompt).await;
                Outcome::Screen(None)
            }
            Command::Signup {
                name,
                email,
                password,
            } => {
                self.landing()?;
                self.app.signup(&name, &email, &password, prompt).await;
                Outcome::Screen(None)
            }
            Command::Demo => {
                self.landing()?;
                let demo = self.config.demo.clone();
                self.app.demo_login(&demo, prompt).await;
                Outcome::Screen(None)
            }
            Command::Logout => {
                self.dashboard()?;
                self.app.logout().await;
                Outcome::Screen(Some("Signed out.".to_string()))
            }
            Command::List => {
                let dashboard = self.dashboard()?;
                if dashboard.view() != View::List {
                    dashboard.back_to_list();
                }
                dashboard.reload().await;
                Outcome::Screen(None)
            }
            Command::New => {
                self.dashboard()?.open_create();
                Outcome::Screen(None)
            }
            Command::Edit(id) => {
                ensure!(self.dashboard()?.open_edit(id), "You have no recipe #{id}");
                Outcome::Screen(None)
            }
            Command::Back => {
                self.dashboard()?.back_to_list();
                Outcome::Screen(None)
            }
            Command::Set { field, value } => {
                self.dashboard()?.form_mut().set_field(&field, &value)?;
                Outcome::Screen(None)
            }
            Command::Photo(path) => {
                self.dashboard()?
                    .form_mut()
                    .attach_photo(&path)
                    .await
                    .with_context(|| format!("Attaching {}", path.display()))?;
                Outcome::Screen(None)
            }
            Command::Unphoto => {
                self.open_form()?.form_mut().remove_photo();
                Outcome::Screen(None)
            }
            Command::Search(text) => {
                self.open_form()?.search_ingredients(&text).await;
                Outcome::Screen(None)
            }
            Command::Pick(n) => {
                let picker = self.open_form()?.form_mut().picker_mut();
                let picked = n.checked_sub(1).is_some_and(|i| picker.select_result(i));
                ensure!(picked, "No search result #{n}");
                Outcome::Screen(None)
            }
            Command::Drop(id) => {
                self.open_form()?.form_mut().picker_mut().deselect(id);
                Outcome::Screen(None)
            }
            Command::Save => {
                let recipe = self.open_form()?.save().await?;
                Outcome::Screen(Some(format!("Saved {:?}.", recipe.title)))
            }
            Command::Delete => {
                let dashboard = self.dashboard()?;
                ensure!(
                    dashboard.view() == View::Edit,
                    "Open a recipe with `edit <id>` first"
                );
                let deleted = dashboard.delete_selected(prompt).await;
                Outcome::Screen(deleted.then(|| "Recipe deleted.".to_string()))
            }
        };
        Ok(outcome)
    }
}
