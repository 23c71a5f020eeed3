use clap;

pub fn parse_flags<'a>() -> clap::ArgMatches<'a> {
    clap::App::new("gcdt")
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .about("Command line interface to GameCube disc images")
        .arg(clap::Arg::from_usage("-d --debug 'Enable debug output'").global(true))
        .arg(
            clap::Arg::from_usage(
                "-p, --path [path] 'Path to the disc image (or, for build, the unpacked directory)'",
            )
            .global(true),
        )
        .subcommand(
            clap::SubCommand::with_name("info")
                .about("Show the disc headers and a summary of its file system table"),
        )
        .subcommand(
            clap::SubCommand::with_name("ls")
                .about("List the files on the disc with their positions and sizes")
                .arg(clap::Arg::from_usage(
                    "-f --folder [folder] 'Folder on the disc to list (defaults to the root)'",
                )),
        )
        .subcommand(
            clap::SubCommand::with_name("check")
                .about("Decode the whole image and cross-check every region"),
        )
        .subcommand(
            clap::SubCommand::with_name("extract")
                .about("Unpack the image into a sys/ and files/ directory tree")
                .arg(
                    clap::Arg::from_usage("--destination <output_folder> 'Folder to unpack into'")
                        .required(true),
                ),
        )
        .subcommand(
            clap::SubCommand::with_name("build")
                .about("Build an image from a sys/ and files/ directory tree")
                .arg(
                    clap::Arg::from_usage("--destination <output_image> 'Path of the image to write'")
                        .required(true),
                )
                .arg(clap::Arg::from_usage(
                    "--alignment [rules_json] 'JSON file with per-extension file alignments'",
                ))
                .arg(clap::Arg::from_usage(
                    "--disc-size [bytes] 'Size of the image in bytes (decimal or 0x-prefixed hex)'",
                )),
        )
        .get_matches()
}
