// <coverage:exclude>
use super::*;
use std::sync::Arc;
use std::sync::Mutex;

// Records commands instead of sending them.
#[derive(Clone, Default)]
pub(crate) struct PlayerStub {
    commands: Arc<Mutex<Vec<PlayerCommand>>>,
    broken: bool,
}

impl PlayerStub {
    pub(crate) fn broken() -> Self {
        PlayerStub {
            broken: true,
            ..Default::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }
}

#[async_trait]
impl PlayerControl for PlayerStub {
    async fn send_command(&mut self, command: PlayerCommand) -> Result<(), Error> {
        if self.broken {
            return Err(Error::PlayerCommandFailed(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}
// </coverage:exclude>
