use anyhow::Result;
use tokio::sync::mpsc;

mod app;
mod config;
mod handler;
mod input;
mod stream;
mod theme;
mod tui;
mod ui;

use app::App;
use config::Config;
use stream::{StreamMessage, StreamService};
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_or_init().unwrap_or_else(|_| Config::new());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let (stream, mut stream_rx) = StreamService::new();
    let mut app = App::new(&config, stream);

    let result = run(&mut terminal, &mut events, &mut stream_rx, &mut app).await;

    tui::restore()?;
    result
}

/// Draw, then wait for the next discrete event: a key press, a stream
/// message, or a tick. All state mutation happens here on the main task, so
/// every appended chunk is followed by a redraw.
async fn run(
    terminal: &mut tui::Tui,
    events: &mut EventHandler,
    stream_rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some((message, stream_id)) = stream_rx.recv() => {
                app.on_stream_message(message, stream_id);
            }
        }
    }

    Ok(())
}
