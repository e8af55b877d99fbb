use app_demo_core::DemoApp;

fn main() {
    if let Err(err) = slipway_adapter_lambda::run_app::<DemoApp>(include_str!("../../../slipway.toml"))
    {
        eprintln!("app-demo-adapter-lambda failed: {err:#}");
        std::process::exit(1);
    }
}
