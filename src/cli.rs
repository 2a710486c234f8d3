use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::commands::{
    availability, categories, consumptions, participants, products, reports, trips,
};
use crate::error::AppResult;
use crate::models::{
    CreateConsumption, CreateParticipant, CreateProduct, CreateTrip, MealFlags, MealType,
    ProductCategory, ProductUnit, SetAvailability, UpdateConsumption, UpdateProduct,
};
use crate::shopping::{
    CsvExportOptions, DateRange, JsonExportOptions, ShoppingListOptions, TripSource,
};
use crate::state::AppState;

const ENV_HELP: &str = concat!(
    "Environment:\n",
    "  TRIP_PANTRY_DB                    Database file\n",
    "  TRIP_PANTRY_LOW_STOCK_THRESHOLD   Default low-stock percentage\n",
    "  RUST_LOG                          Log filter\n",
    "  LOG_FORMAT                        'json' for JSON logs",
);

#[derive(Parser)]
#[command(name = "trip-pantry")]
#[command(about = "Trip food planning and shopping lists")]
#[command(after_help = ENV_HELP)]
pub struct Cli {
    /// Database file
    #[arg(long, global = true, env = "TRIP_PANTRY_DB")]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Trip {
        #[command(subcommand)]
        command: TripCommand,
    },
    Participant {
        #[command(subcommand)]
        command: ParticipantCommand,
    },
    Product {
        #[command(subcommand)]
        command: ProductCommand,
    },
    /// List category codes and display names
    Categories,
    Consumption {
        #[command(subcommand)]
        command: ConsumptionCommand,
    },
    Availability {
        #[command(subcommand)]
        command: AvailabilityCommand,
    },
    /// Print the aggregated shopping list as JSON
    List(ListArgs),
    Variance {
        #[arg(long)]
        trip: i64,
    },
    Suggestions {
        #[arg(long)]
        trip: i64,
    },
    LowStock {
        #[arg(long)]
        trip: i64,
        /// Remaining percentage at or below which a product is reported
        #[arg(long)]
        threshold: Option<f64>,
    },
    Export(ExportArgs),
}

#[derive(Subcommand)]
pub enum TripCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommand {
    Add {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[arg(long)]
        trip: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
pub struct ProductFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    category: ProductCategory,
    #[arg(long)]
    unit: ProductUnit,
    /// Expected quantity per person and meal; marks the product essential
    #[arg(long)]
    per_person: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
pub enum ProductCommand {
    Add(ProductFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
    List,
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ConsumptionCommand {
    Add {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        participant: i64,
        #[arg(long)]
        product: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        meal: MealType,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        meal: Option<MealType>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
    },
    List {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AvailabilityCommand {
    Set {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        participant: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        breakfast: bool,
        #[arg(long)]
        lunch: bool,
        #[arg(long)]
        dinner: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    trip: i64,
    #[arg(long)]
    essential_only: bool,
    /// Repeat to allow several categories
    #[arg(long = "category")]
    categories: Vec<ProductCategory>,
    #[arg(long)]
    multiplier: Option<f64>,
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
    /// Skip the trip lookup and use placeholder trip metadata
    #[arg(long)]
    placeholder_trip: bool,
}

impl ListArgs {
    fn options(&self) -> ShoppingListOptions {
        ShoppingListOptions {
            essential_only: self.essential_only,
            date_range: self.from.zip(self.to).map(|(start_date, end_date)| DateRange {
                start_date,
                end_date,
            }),
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            quantity_multiplier: self.multiplier,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    list: ListArgs,
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
    /// Add one quantity column per day
    #[arg(long)]
    daily: bool,
    #[arg(long)]
    no_notes: bool,
    #[arg(long)]
    no_header: bool,
    /// Order rows by product name instead of category
    #[arg(long)]
    by_name: bool,
    #[arg(long)]
    compact: bool,
    #[arg(long, default_value_t = 2)]
    indent: usize,
}

fn to_output<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Runs one subcommand and returns what should be printed
pub async fn execute(state: &AppState, command: Command) -> AppResult<String> {
    match command {
        Command::Trip { command } => match command {
            TripCommand::Add {
                name,
                start,
                end,
                description,
            } => {
                let trip = CreateTrip {
                    name,
                    description,
                    start_date: start,
                    end_date: end,
                };
                to_output(&trips::create_trip(state, trip).await?)
            }
            TripCommand::List => to_output(&trips::get_trips(state).await?),
            TripCommand::Delete { id } => {
                trips::delete_trip(state, id).await?;
                Ok(format!("deleted trip {}", id))
            }
        },
        Command::Participant { command } => match command {
            ParticipantCommand::Add {
                trip,
                name,
                email,
                notes,
            } => {
                let participant = CreateParticipant {
                    trip_id: trip,
                    name,
                    email,
                    notes,
                };
                to_output(&participants::create_participant(state, participant).await?)
            }
            ParticipantCommand::List { trip } => {
                to_output(&participants::get_participants(state, trip).await?)
            }
            ParticipantCommand::Delete { id } => {
                participants::delete_participant(state, id).await?;
                Ok(format!("deleted participant {}", id))
            }
        },
        Command::Product { command } => match command {
            ProductCommand::Add(fields) => {
                let product = CreateProduct {
                    name: fields.name,
                    category: fields.category,
                    unit: fields.unit,
                    default_quantity_per_person: fields.per_person,
                    notes: fields.notes,
                };
                to_output(&products::create_product(state, product).await?)
            }
            ProductCommand::Update { id, fields } => {
                let product = UpdateProduct {
                    id,
                    name: fields.name,
                    category: fields.category,
                    unit: fields.unit,
                    default_quantity_per_person: fields.per_person,
                    notes: fields.notes,
                };
                to_output(&products::update_product(state, product).await?)
            }
            ProductCommand::List => to_output(&products::get_products(state).await?),
            ProductCommand::Delete { id } => {
                products::delete_product(state, id).await?;
                Ok(format!("deleted product {}", id))
            }
        },
        Command::Categories => to_output(&categories::get_categories()),
        Command::Consumption { command } => match command {
            ConsumptionCommand::Add {
                trip,
                participant,
                product,
                date,
                meal,
                quantity,
                notes,
            } => {
                let consumption = CreateConsumption {
                    trip_id: trip,
                    participant_id: participant,
                    product_id: product,
                    date,
                    meal_type: meal,
                    quantity,
                    notes,
                };
                to_output(&consumptions::record_consumption(state, consumption).await?)
            }
            ConsumptionCommand::Update {
                id,
                quantity,
                meal,
                notes,
                clear_notes,
            } => {
                let update = UpdateConsumption {
                    id,
                    quantity,
                    meal_type: meal,
                    notes: if clear_notes { Some(None) } else { notes.map(Some) },
                };
                to_output(&consumptions::update_consumption(state, update).await?)
            }
            ConsumptionCommand::List { trip, date } => {
                to_output(&consumptions::get_consumptions(state, trip, date).await?)
            }
            ConsumptionCommand::Delete { id } => {
                consumptions::delete_consumption(state, id).await?;
                Ok(format!("deleted consumption {}", id))
            }
        },
        Command::Availability { command } => match command {
            AvailabilityCommand::Set {
                trip,
                participant,
                date,
                breakfast,
                lunch,
                dinner,
                notes,
            } => {
                let availability = SetAvailability {
                    participant_id: participant,
                    trip_id: trip,
                    date,
                    meals: MealFlags {
                        breakfast,
                        lunch,
                        dinner,
                    },
                    notes,
                };
                to_output(&availability::set_availability(state, availability).await?)
            }
            AvailabilityCommand::List { trip, date } => {
                to_output(&availability::get_availability(state, trip, date).await?)
            }
            AvailabilityCommand::Delete { id } => {
                availability::delete_availability(state, id).await?;
                Ok(format!("deleted availability {}", id))
            }
        },
        Command::List(args) => {
            let state = list_state(state, &args);
            to_output(&reports::get_shopping_list(&state, args.trip, args.options()).await?)
        }
        Command::Variance { trip } => {
            to_output(&reports::get_consumption_variance(state, trip).await?)
        }
        Command::Suggestions { trip } => {
            to_output(&reports::get_shopping_suggestions(state, trip).await?)
        }
        Command::LowStock { trip, threshold } => {
            to_output(&reports::get_low_stock(state, trip, threshold).await?)
        }
        Command::Export(args) => {
            let state = list_state(state, &args.list);
            let list_options = args.list.options();
            match args.format {
                ExportFormat::Csv => {
                    let options = CsvExportOptions {
                        include_daily_breakdown: args.daily,
                        include_notes: !args.no_notes,
                        sort_by_category: !args.by_name,
                        include_header: !args.no_header,
                    };
                    reports::export_csv(&state, args.list.trip, list_options, options).await
                }
                ExportFormat::Json => {
                    let options = JsonExportOptions {
                        pretty: !args.compact,
                        indent: args.indent,
                    };
                    reports::export_json(&state, args.list.trip, list_options, options).await
                }
            }
        }
    }
}

fn list_state(state: &AppState, args: &ListArgs) -> AppState {
    let mut state = state.clone();
    if args.placeholder_trip {
        state.shopping = state.shopping.with_trip_source(TripSource::Placeholder);
    }
    state
}
