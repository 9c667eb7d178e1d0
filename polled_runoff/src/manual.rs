/*!

This is the long-form manual for `polled_runoff` and `rcvsim`.

## The model

No individual ballots are involved. A scenario is made of:
* the first-choice support of each candidate, as a percentage of the ballots
* the exhaustion rate of each candidate: the percentage of its ballots that do
  not rank anyone else and leave the count when it is eliminated
* the ideology of each candidate (`progressive`, `moderate` or `conservative`)
* a modifier table: for each ideology, a modifier for every candidate

The voters of a candidate rank the others in proportion to their first-choice
support, scaled by `1 + modifier` for the ideology of that candidate. A modifier
of `-1` means these voters never transfer to that candidate, `0` leaves the
support untouched, `1` doubles it.

The elimination then proceeds as a regular instant-runoff count, one candidate
at a time. Ties for the last place are broken in alphabetical order.

## Configuration

`rcvsim` reads a scenario in JSON:

```text
{
  "outputSettings": {
    "contestName": "Mayoral primary",
    "contestDate": "2025-06-24",
    "contestJurisdiction": "New York City",
    "contestOffice": "Mayor"
  },
  "candidates": [
    { "name": "Alice", "support": 40, "exhaustionRate": 10, "ideology": "moderate" },
    { "name": "Bob", "support": 35, "exhaustionRate": 10, "ideology": "moderate" }
  ],
  "ideologyModifiers": {
    "progressive": { "Alice": 0.3, "Bob": -0.5 },
    "moderate": { "Alice": 0, "Bob": 0 },
    "conservative": { "Alice": 0, "Bob": 0.8 }
  },
  "defaultModifier": 0
}
```

Notes:
- `support` and `exhaustionRate` may be left out when they are provided by a poll source.
- `defaultModifier` (optional) fills the missing entries of `ideologyModifiers`.
  Without it, every ideology must list every candidate.
- the support is rescaled to sum to 100 if it does not already.

### Poll sources

The `pollSources` entry lists CSV files with polling numbers:

```text
"pollSources": [
  {
    "provider": "csv",
    "filePath": "poll.csv",
    "firstRowIndex": 2,
    "nameColumnIndex": 1,
    "supportColumnIndex": 2,
    "exhaustionColumnIndex": "C"
  }
]
```

The paths are relative to the configuration file. Indices start at 1, columns can
also be given as letters. Later sources overwrite the numbers of earlier ones.

```text
candidate,support,exhaustion
Alice,40.5,10
Bob,35,12
```

## Outputs

The summary is written in JSON, with one entry per round (`tally`, `activeShares`,
`activeBallots` and the `tallyResults`), followed by the `winner`. All the
numbers are percentages of the original ballots, written with 4 decimals, except
`activeShares` which are percentages of the ballots still active in that round.

The CSV export has one row per candidate with some first-choice support, sorted
by that support, and one column per round with the share of the active ballots
(`-` once eliminated, or when down to no votes). Two extra rows give the ballots
remaining and exhausted. The abridged export only keeps the first round, every
third round and the last two rounds.

*/
