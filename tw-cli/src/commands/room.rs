//! Room commands.

use clap::Subcommand;

use tw_core::config::ConfigHandle;
use tw_core::error::{TwError, TwResult};
use tw_models::{ChatMode, InvitationMode};
use tw_services::controllers::RoomConfigController;
use tw_services::Service;

use super::observer::CliObserver;
use super::App;
use crate::RunOptions;

#[derive(Subcommand)]
pub enum RoomAction {
    /// Show a room and its configuration.
    Show {
        /// Room id.
        room_id: String,
    },
    /// Change a room's configuration.
    Configure {
        /// Room id.
        room_id: String,
        /// Welcome message. An empty string removes it.
        #[arg(long)]
        welcome: Option<String>,
        /// Chat mode (public, channel_only, feedback_only).
        #[arg(long)]
        chat_mode: Option<String>,
        /// Who may invite new members (public, admin_only).
        #[arg(long)]
        invitation_mode: Option<String>,
    },
}

/// Configuration edits, applied one at a time.
#[derive(Debug, PartialEq)]
enum RoomEdit {
    Welcome(String),
    Chat(ChatMode),
    Invitation(InvitationMode),
}

fn parse_edits(
    welcome: Option<String>,
    chat_mode: Option<String>,
    invitation_mode: Option<String>,
) -> TwResult<Vec<RoomEdit>> {
    let mut edits = Vec::new();
    if let Some(message) = welcome {
        edits.push(RoomEdit::Welcome(message));
    }
    if let Some(mode) = chat_mode {
        let mode = ChatMode::parse(&mode)
            .ok_or_else(|| TwError::InvalidInput(format!("unknown chat mode {mode}")))?;
        edits.push(RoomEdit::Chat(mode));
    }
    if let Some(mode) = invitation_mode {
        let mode = InvitationMode::parse(&mode)
            .ok_or_else(|| TwError::InvalidInput(format!("unknown invitation mode {mode}")))?;
        edits.push(RoomEdit::Invitation(mode));
    }
    Ok(edits)
}

pub async fn run(config: ConfigHandle, action: RoomAction, options: RunOptions) -> TwResult<()> {
    let (room_id, edits) = match action {
        RoomAction::Show { room_id } => (room_id, Vec::new()),
        RoomAction::Configure {
            room_id,
            welcome,
            chat_mode,
            invitation_mode,
        } => {
            let edits = parse_edits(welcome, chat_mode, invitation_mode)?;
            if edits.is_empty() {
                return Err(TwError::InvalidInput(
                    "nothing to change, pass --welcome, --chat-mode or --invitation-mode".into(),
                ));
            }
            (room_id, edits)
        }
    };

    let app = App::start(&config, options).await?;
    let observer = CliObserver::new("Loading room", options.format);
    let mut controller = RoomConfigController::new(&app.ctx, observer.clone());
    controller.init()?;

    let result = drive(&controller, &observer, &app, &room_id, edits).await;

    controller.shutdown()?;
    result
}

async fn drive(
    controller: &RoomConfigController,
    observer: &CliObserver,
    app: &App,
    room_id: &str,
    edits: Vec<RoomEdit>,
) -> TwResult<()> {
    controller.load(room_id)?;
    observer.wait(app.wait).await?;

    for edit in edits {
        match edit {
            RoomEdit::Welcome(message) => controller.set_welcome_message(&message)?,
            RoomEdit::Chat(mode) => controller.set_chat_mode(mode)?,
            RoomEdit::Invitation(mode) => controller.set_invitation_mode(mode)?,
        }
        observer.wait(app.wait).await?;
    }
    Ok(())
}
