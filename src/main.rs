use doit::env::Environment;
use doit::{Args, Config, Interpreter};

fn main() -> std::process::ExitCode {
    let args: Args = argh::from_env();
    let env = Environment::new();
    let config = match Config::resolve(&args, &env) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("doit: {err:#}");
            return std::process::ExitCode::from(2);
        }
    };
    doit::logger::init(config.log_level);

    let mut shell = Interpreter::with_env(env, &config);
    let result = if args.command.is_empty() {
        shell.repl()
    } else {
        shell.run_once(args.command, &mut std::io::stdout())
    };

    match result {
        Ok(code) => std::process::ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            log::error!("{err:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
