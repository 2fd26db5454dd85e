mod app;
mod meter;

use recorder_core::RecorderController;
use recorder_cpal::CpalLineProvider;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let controller = RecorderController::new(CpalLineProvider::default_device());
    app::App::new(controller)?.run()
}
