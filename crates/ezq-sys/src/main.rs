// Entry point: bring up the video adapter and run the input/present loop.

use std::collections::HashSet;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use ezq_client::client::{ClientHooks, ClientState};
use ezq_client::cvar_guards::ClientGuards;
use ezq_client::rulesets::Rulesets;
use ezq_common::common::{com_printf, sys_double_time, ComArgs};
use ezq_common::cvar::{ChangeVerdict, CvarContext, CvarGuard};
use ezq_common::keys::KeyDispatch;
use ezq_common::q_shared::{UserCmd, Vec3};
use ezq_sys::backend::DisplayBackend;
use ezq_sys::in_mouse::{in_init, in_mouse_move, new_shared_mouse, MouseInput, MouseMoveParams};
use ezq_sys::vid_imp::VidContext;
use ezq_sys::winit_backend::WinitBackend;
use ezq_sys::{signals, sys};

/// Client services this front end has no real implementation of; requests
/// are only logged.
struct Hooks;

impl ClientHooks for Hooks {
    fn cache_flush(&mut self) {
        tracing::debug!("cache flush");
    }

    fn reinit_all_macros(&mut self) {
        tracing::debug!("macros reinitialised");
    }

    fn cbuf_add_text(&mut self, text: &str) {
        com_printf(text);
    }
}

#[derive(Default)]
struct KeyStates {
    down: HashSet<i32>,
}

impl KeyDispatch for KeyStates {
    fn key_event(&mut self, key: i32, down: bool) {
        tracing::trace!(key, down, "key");
        if down {
            self.down.insert(key);
        } else {
            self.down.remove(&key);
        }
    }

    fn clear_states(&mut self) {
        self.down.clear();
    }
}

/// Offers an assignment to the video hooks, then to the client hooks.
struct Guards<'a, B: DisplayBackend> {
    vid: &'a mut VidContext<B>,
    client: ClientGuards<'a>,
}

impl<B: DisplayBackend> CvarGuard for Guards<'_, B> {
    fn on_change(&mut self, cvars: &mut CvarContext, name: &str, value: &str) -> ChangeVerdict {
        if self.vid.on_change(cvars, name, value) == ChangeVerdict::Reject {
            return ChangeVerdict::Reject;
        }
        self.client.on_change(cvars, name, value)
    }
}

/// `+set <name> <value>` pairs from the command line.
fn startup_sets(args: &ComArgs) -> Vec<(String, String)> {
    let mut sets = Vec::new();
    let mut i = 1;
    while i + 2 < args.argc() {
        if args.argv(i) == "+set" {
            sets.push((args.argv(i + 1).to_string(), args.argv(i + 2).to_string()));
            i += 3;
        } else {
            i += 1;
        }
    }
    sets
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let argv: Vec<String> = std::env::args().collect();
    let args = ComArgs::from_args(&argv);

    let mut cvars = CvarContext::new();
    let client = ClientState::default();
    let mut hooks = Hooks;
    let mut rulesets = Rulesets::new();
    rulesets.init(&mut cvars, &args, &client, &mut hooks);

    let backend = match WinitBackend::open() {
        Ok(b) => b,
        Err(e) => sys::sys_error(&e.to_string()),
    };

    let accum = new_shared_mouse();
    let mut vid = match VidContext::init(backend, &mut cvars, &args, accum.clone()) {
        Ok(v) => v,
        Err(e) => sys::sys_error(&e.to_string()),
    };
    signals::install();

    let mouse_cvars = in_init(&mut cvars);
    let mut mouse = MouseInput::new(accum);

    for (name, value) in startup_sets(&args) {
        let mut guards = Guards {
            vid: &mut vid,
            client: ClientGuards { rulesets: &mut rulesets, client: &client, hooks: &mut hooks },
        };
        cvars.set_guarded(&name, &value, &mut guards);
    }

    let mut keys = KeyStates::default();
    let mut viewangles: Vec3 = [0.0; 3];
    let mut oldtime = sys_double_time();

    loop {
        if let Some(sig) = signals::pending() {
            vid.shutdown();
            com_printf(&format!("Received signal {}, exiting...\n", sig));
            signals::reraise(sig);
            sys::sys_quit();
        }

        if vid.send_key_events(&mut cvars, &mut keys) {
            break;
        }

        // +mlook and +strafe belong to the key binding layer, which is not here
        let params = MouseMoveParams::from_cvars(&cvars, &mouse_cvars, false, false);
        let mut cmd = UserCmd::default();
        in_mouse_move(&mut mouse, &mut cmd, &mut viewangles, &params);

        vid.begin_rendering();
        vid.end_rendering(&cvars);

        // frame rate cap
        let max_fps = rulesets.max_fps(&client);
        if max_fps > 0.0 {
            let frame = 1.0 / max_fps as f64;
            let elapsed = sys_double_time() - oldtime;
            if elapsed < frame {
                std::thread::sleep(Duration::from_secs_f64(frame - elapsed));
            }
        }
        oldtime = sys_double_time();
    }

    vid.shutdown();
    sys::sys_quit();
}
