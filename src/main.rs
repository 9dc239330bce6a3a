// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use colored::Colorize;
use productionapp::cli::{logging, CliArgs, Commands};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    if let Err(e) = args.validate() {
        e.exit();
    }

    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let settings = args.global.load_settings()?;
    logging::init(&settings.logging)?;

    match &args.command {
        Commands::Deploy(cmd) => cmd.execute(&args.global, &settings).await,
        Commands::Destroy(cmd) => cmd.execute(&args.global, &settings).await,
        Commands::List(cmd) => cmd.execute(&settings).await,
    }
}
