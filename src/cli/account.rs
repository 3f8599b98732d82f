//! tasknest account command implementations.

use serde::Serialize;

use crate::cli::{AccountCommands, Context};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::{Profile, SessionState};

#[derive(Serialize)]
struct SessionOutput {
    state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Profile>,
    message: String,
    task_count: usize,
}

#[derive(Serialize)]
struct HistoryOutput {
    scheme: &'static str,
    count: usize,
    credentials: Vec<String>,
}

pub(crate) fn run(mut ctx: Context, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Register { email, password } => {
            ctx.session.register(&email, &password)?;
            emit_session(&ctx, "account register")
        }
        AccountCommands::SignIn { email, password } => {
            ctx.session.sign_in(&email, &password)?;
            emit_session(&ctx, "account sign-in")
        }
        AccountCommands::SignOut => {
            ctx.session.sign_out()?;
            emit_session(&ctx, "account sign-out")
        }
        AccountCommands::Whoami => emit_session(&ctx, "account whoami"),
        AccountCommands::History => run_history(&ctx),
    }
}

fn emit_session(ctx: &Context, command: &str) -> Result<()> {
    let session = &ctx.session;
    let user = session.current_user();
    let task_count = session.tasks_for_current_user().len();

    let header = match (session.last_message(), user) {
        ("", Some(_)) => "Signed in",
        ("", None) => "Not signed in",
        (message, _) => message,
    };
    let mut human = HumanOutput::new(header);
    if let Some(user) = user {
        human.push_summary("Email", user.email.clone());
        human.push_summary("User ID", user.id.to_string());
        if let Some(profile) = session.current_profile() {
            human.push_summary("Username", profile.username.clone());
        }
        human.push_summary("Tasks", task_count.to_string());
    } else {
        human.push_next_step("tasknest account sign-in <email> <password>");
    }

    let output = SessionOutput {
        state: session.state(),
        user_id: user.map(|user| user.id),
        email: user.map(|user| user.email.clone()),
        profile: session.current_profile().cloned(),
        message: session.last_message().to_string(),
        task_count,
    };
    emit_success(ctx.output, command, &output, Some(&human))
}

fn run_history(ctx: &Context) -> Result<()> {
    let history = ctx.session.previous_passwords();
    let scheme = ctx.session.hasher().scheme();

    let mut human = HumanOutput::new(format!("Credential history ({})", history.len()));
    human.push_summary("Scheme", scheme);
    for (index, credential) in history.iter().enumerate() {
        human.push_detail(format!("{}: {credential}", index + 1));
    }
    if scheme == "plaintext" {
        human.push_warning("credentials.scheme = plaintext: history holds raw passwords");
    }

    emit_success(
        ctx.output,
        "account history",
        &HistoryOutput {
            scheme,
            count: history.len(),
            credentials: history.to_vec(),
        },
        Some(&human),
    )
}
