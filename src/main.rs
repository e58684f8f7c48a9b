// f3 main program

mod config;
mod error;
mod files;
mod internals;
mod kernel;
mod messages;
mod runtime;

use config::Config;
use runtime::Vm;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = Config::process_args();

    let mut vm = match &config.core {
        Some(path) => match internals::coredump::load_core_image(path) {
            Ok(image) => Vm::warm_start(image, config.debug_level),
            Err(e) => {
                eprintln!("( error \"could not load core image: {}\" )", e);
                return ExitCode::FAILURE;
            }
        },
        None => match Vm::cold_start(config.core_size, config.debug_level) {
            Ok(vm) => vm,
            Err(e) => {
                eprintln!("( error \"bootstrap failed: {}\" )", e);
                return ExitCode::FAILURE;
            }
        },
    };

    if let Err(e) = files::load_files(&mut vm, &config.files) {
        eprintln!("( error \"{}\" )", e);
        return ExitCode::FAILURE;
    }

    if !vm.exit_flag {
        if let Err(e) = vm.repl() {
            eprintln!("( error \"{}\" )", e);
            return ExitCode::FAILURE;
        }
    }

    // `-d` dumps the final core image only once the session has ended, not
    // instead of running it.
    if let Some(dump_path) = &config.dump {
        if let Err(e) = internals::coredump::dump_to_path(&vm.image, dump_path) {
            eprintln!("( error \"could not write core image: {}\" )", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
