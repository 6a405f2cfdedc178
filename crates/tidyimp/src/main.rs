// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Binary entry point for the tidyimp CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    tidyimp::cli::main()
}
