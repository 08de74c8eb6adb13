use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use sqlite_reader::{Database, QueryOutput, SelectStatement};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (file, command) = match args.as_slice() {
        [file, command] => (file, command),
        [_] => bail!("missing <command>"),
        _ => bail!("usage: db <file> <.dbinfo | .tables | SELECT statement>"),
    };

    let mut db = Database::open(file).with_context(|| format!("cannot open {file}"))?;

    match command.as_str() {
        ".dbinfo" => {
            println!("database page size: {}", db.page_size());
            println!("number of tables: {}", db.table_count());
        }
        ".tables" => {
            println!("{}", db.list_tables().join(" "));
        }
        sql => {
            let stmt = SelectStatement::parse(sql)?;
            match db.execute(&stmt)? {
                QueryOutput::Count(count) => println!("{count}"),
                QueryOutput::Rows(rows) => {
                    for row in rows {
                        println!("{}", row.join("|"));
                    }
                }
            }
        }
    }

    Ok(())
}
