// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
use std::{env, fs, path::PathBuf};

fn main() {
    env_logger::init();

    let path = PathBuf::from(env::args_os().nth(1).expect("Specify path to an AVIF file"));
    let file = fs::read(&path).expect("couldn't read file");

    let (status, features) = avif_info::get_with_size(&file, file.len() as u32);
    println!("{path:?}: {status:?}");
    if status == avif_info::Status::Ok {
        println!("{features:#?}");
    }
}
